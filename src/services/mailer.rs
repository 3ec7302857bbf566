//! Transactional email builders
//!
//! Each function turns a domain event into an `EmailMessage`. Anything that
//! came from a visitor or a client is HTML-escaped before it is interpolated.

use tracing::{error, info};

use super::email::{Attachment, EmailClient, EmailMessage, SendOutcome};
use crate::config::Settings;
use crate::domain::contacts::Contact;
use crate::domain::estimates::Estimate;
use crate::domain::quotations::{format_money, Quotation, QuotationStatus};
use crate::domain::settings::SiteSettings;

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escaped text with line breaks kept
fn escape_multiline(input: &str) -> String {
    escape_html(input).replace('\n', "<br>")
}

/// `user_accounts` -> `User accounts`
fn humanize(code: &str) -> String {
    let spaced = code.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn wrap(heading: &str, body: &str, signature: &str) -> String {
    format!(
        "<!doctype html><html><body style=\"font-family:Helvetica,Arial,sans-serif;color:#222\">\
         <h2>{}</h2>{}<p style=\"color:#777\">{}</p></body></html>",
        escape_html(heading),
        body,
        escape_html(signature)
    )
}

/// Two-column detail table; `None` values are skipped
fn details(rows: &[(&str, Option<&str>)]) -> String {
    let mut html = String::from("<table cellpadding=\"4\">");
    for (label, value) in rows {
        if let Some(value) = value {
            html.push_str(&format!(
                "<tr><td><strong>{}</strong></td><td>{}</td></tr>",
                escape_html(label),
                escape_multiline(value)
            ));
        }
    }
    html.push_str("</table>");
    html
}

fn text_details(rows: &[(&str, Option<&str>)]) -> String {
    rows.iter()
        .filter_map(|(label, value)| value.map(|v| format!("{}: {}", label, v)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Where back-office notifications go: the configured address, else the
/// public contact email from site settings.
pub fn admin_recipient(config: &Settings, site: &SiteSettings) -> Option<String> {
    config
        .admin_notification_email
        .clone()
        .or_else(|| site.notification_address().map(str::to_string))
}

// =============================================================================
// Contact form
// =============================================================================

pub fn contact_notification(admin_to: &str, contact: &Contact) -> EmailMessage {
    let subject_line = contact.subject.as_deref().unwrap_or("(no subject)");
    let rows = [
        ("Name", Some(contact.name.as_str())),
        ("Email", Some(contact.email.as_str())),
        ("Phone", contact.phone.as_deref()),
        ("Company", contact.company.as_deref()),
        ("Subject", contact.subject.as_deref()),
        ("Message", Some(contact.message.as_str())),
    ];

    EmailMessage {
        to: vec![admin_to.to_string()],
        subject: format!("New contact message: {}", subject_line),
        html: wrap("New contact message", &details(&rows), "Sent from the website contact form"),
        text: Some(text_details(&rows)),
        reply_to: Some(contact.email.clone()),
        attachments: Vec::new(),
    }
}

pub fn contact_acknowledgement(contact: &Contact, site: &SiteSettings) -> EmailMessage {
    let body = format!(
        "<p>Hello {},</p><p>Thank you for your message. I have received it and will get \
         back to you shortly.</p><blockquote>{}</blockquote>",
        escape_html(&contact.name),
        escape_multiline(&contact.message)
    );

    EmailMessage {
        to: vec![contact.email.clone()],
        subject: format!("We received your message - {}", site.business_name),
        html: wrap("Thanks for getting in touch", &body, &site.business_name),
        text: Some(format!(
            "Hello {},\n\nThank you for your message. I have received it and will get back to you shortly.\n\n{}",
            contact.name, site.business_name
        )),
        reply_to: site.notification_address().map(str::to_string),
        attachments: Vec::new(),
    }
}

// =============================================================================
// Estimate form
// =============================================================================

fn estimate_range(estimate: &Estimate) -> String {
    format!(
        "{} - {}",
        format_money(estimate.estimated_min, &estimate.currency),
        format_money(estimate.estimated_max, &estimate.currency)
    )
}

fn feature_list(estimate: &Estimate) -> String {
    if estimate.features.is_empty() {
        return "None".to_string();
    }
    estimate
        .features
        .iter()
        .map(|f| humanize(f.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn estimate_notification(admin_to: &str, estimate: &Estimate) -> EmailMessage {
    let range = estimate_range(estimate);
    let project_type = humanize(estimate.project_type.as_str());
    let pages = estimate.pages.to_string();
    let features = feature_list(estimate);
    let design = humanize(estimate.design_level.as_str());
    let timeline = humanize(estimate.timeline.as_str());
    let rows = [
        ("Name", Some(estimate.name.as_str())),
        ("Email", Some(estimate.email.as_str())),
        ("Phone", estimate.phone.as_deref()),
        ("Company", estimate.company.as_deref()),
        ("Project type", Some(project_type.as_str())),
        ("Pages", Some(pages.as_str())),
        ("Features", Some(features.as_str())),
        ("Design", Some(design.as_str())),
        ("Timeline", Some(timeline.as_str())),
        ("Budget", estimate.budget_range.as_deref()),
        ("Description", estimate.description.as_deref()),
        ("Estimated range", Some(range.as_str())),
    ];

    EmailMessage {
        to: vec![admin_to.to_string()],
        subject: format!("New estimate request from {} ({})", estimate.name, range),
        html: wrap("New estimate request", &details(&rows), "Sent from the website estimate form"),
        text: Some(text_details(&rows)),
        reply_to: Some(estimate.email.clone()),
        attachments: Vec::new(),
    }
}

pub fn estimate_acknowledgement(estimate: &Estimate, site: &SiteSettings) -> EmailMessage {
    let range = estimate_range(estimate);
    let body = format!(
        "<p>Hello {},</p><p>Thanks for describing your {} project. Based on your answers the \
         indicative budget is <strong>{}</strong>.</p><p>This range is an estimate, not a \
         quotation. I will review your request and send you a detailed proposal.</p>",
        escape_html(&estimate.name),
        escape_html(&humanize(estimate.project_type.as_str()).to_lowercase()),
        escape_html(&range)
    );

    EmailMessage {
        to: vec![estimate.email.clone()],
        subject: format!("Your project estimate - {}", site.business_name),
        html: wrap("Your project estimate", &body, &site.business_name),
        text: Some(format!(
            "Hello {},\n\nBased on your answers the indicative budget is {}.\n\
             This range is an estimate, not a quotation.\n\n{}",
            estimate.name, range, site.business_name
        )),
        reply_to: site.notification_address().map(str::to_string),
        attachments: Vec::new(),
    }
}

// =============================================================================
// Quotations
// =============================================================================

/// Quotation sent to the client with the public link and the PDF attached
pub fn quotation_email(
    quotation: &Quotation,
    site: &SiteSettings,
    link: &str,
    pdf: Vec<u8>,
    filename: String,
) -> EmailMessage {
    let total = format_money(quotation.totals.total, &quotation.currency);
    let validity = quotation
        .valid_until
        .map(|d| format!("<p>This quotation is valid until {}.</p>", d.format("%Y-%m-%d")))
        .unwrap_or_default();

    let body = format!(
        "<p>Hello {},</p><p>Please find attached quotation <strong>{}</strong> for \
         &laquo;{}&raquo;, totalling <strong>{}</strong>.</p>{}\
         <p><a href=\"{}\">View, accept or decline the quotation online</a></p>",
        escape_html(&quotation.client_name),
        escape_html(&quotation.quote_number),
        escape_html(&quotation.title),
        escape_html(&total),
        validity,
        escape_html(link)
    );

    EmailMessage {
        to: vec![quotation.client_email.clone()],
        subject: format!(
            "Quotation {} - {}",
            quotation.quote_number, site.business_name
        ),
        html: wrap(&quotation.title, &body, &site.business_name),
        text: Some(format!(
            "Hello {},\n\nPlease find attached quotation {} ({}), total {}.\n\
             View, accept or decline it online: {}\n\n{}",
            quotation.client_name,
            quotation.quote_number,
            quotation.title,
            total,
            link,
            site.business_name
        )),
        reply_to: site.notification_address().map(str::to_string),
        attachments: vec![Attachment {
            filename,
            content: pdf,
        }],
    }
}

pub fn quotation_response_notification(admin_to: &str, quotation: &Quotation) -> EmailMessage {
    let verdict = match quotation.status {
        QuotationStatus::Accepted => "accepted",
        QuotationStatus::Rejected => "declined",
        other => other.as_str(),
    };
    let total = format_money(quotation.totals.total, &quotation.currency);
    let rows = [
        ("Quotation", Some(quotation.quote_number.as_str())),
        ("Title", Some(quotation.title.as_str())),
        ("Client", Some(quotation.client_name.as_str())),
        ("Company", quotation.client_company.as_deref()),
        ("Email", Some(quotation.client_email.as_str())),
        ("Total", Some(total.as_str())),
    ];

    EmailMessage {
        to: vec![admin_to.to_string()],
        subject: format!(
            "Quotation {} {} by {}",
            quotation.quote_number, verdict, quotation.client_name
        ),
        html: wrap(
            &format!("Quotation {}", verdict),
            &details(&rows),
            "Response received through the public quotation link",
        ),
        text: Some(text_details(&rows)),
        reply_to: Some(quotation.client_email.clone()),
        attachments: Vec::new(),
    }
}

/// Fire-and-forget delivery; failures are logged, never surfaced.
pub fn deliver_in_background(client: &EmailClient, message: EmailMessage, kind: &'static str) {
    let client = client.clone();
    tokio::spawn(async move {
        match client.send(&message).await {
            Ok(SendOutcome::Sent { id }) => {
                info!(kind = kind, email_id = ?id, "Notification email delivered")
            }
            Ok(SendOutcome::Skipped) => {}
            Err(e) => error!(kind = kind, error = %e, "Notification email failed"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_settings;
    use crate::domain::contacts::ContactStatus;
    use crate::domain::estimates::{DesignLevel, EstimateStatus, Feature, ProjectType, Timeline};
    use crate::domain::quotations::QuotationTotals;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn contact() -> Contact {
        Contact {
            id: Uuid::new_v4(),
            name: "Eve <script>".to_string(),
            email: "eve@example.com".to_string(),
            phone: None,
            company: Some("Tom & Co".to_string()),
            subject: Some("Website".to_string()),
            message: "Line one\n<b>Line two</b>".to_string(),
            status: ContactStatus::New,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn estimate() -> Estimate {
        Estimate {
            id: Uuid::new_v4(),
            name: "Sam".to_string(),
            email: "sam@example.com".to_string(),
            phone: None,
            company: None,
            project_type: ProjectType::WebApp,
            pages: 8,
            features: vec![Feature::UserAccounts, Feature::Seo],
            design_level: DesignLevel::Custom,
            timeline: Timeline::Standard,
            budget_range: None,
            description: None,
            estimated_min: Decimal::new(9850, 0),
            estimated_max: Decimal::new(20500, 0),
            currency: "EUR".to_string(),
            status: EstimateStatus::New,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn quotation(status: QuotationStatus) -> Quotation {
        Quotation {
            id: Uuid::new_v4(),
            quote_number: "Q-2024-0003".to_string(),
            estimate_id: None,
            client_name: "Ana".to_string(),
            client_email: "ana@client.test".to_string(),
            client_company: None,
            client_address: None,
            title: "Booking site".to_string(),
            description: None,
            items: Vec::new(),
            totals: QuotationTotals {
                subtotal: Decimal::new(150000, 2),
                discount: Decimal::ZERO,
                tax_rate: Decimal::ZERO,
                tax_amount: Decimal::ZERO,
                total: Decimal::new(150000, 2),
            },
            currency: "EUR".to_string(),
            status,
            valid_until: NaiveDate::from_ymd_opt(2024, 5, 1),
            notes: None,
            share_token: "abc".to_string(),
            sent_at: None,
            responded_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<a href=\"x\">Tom & 'Jerry'</a>"),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn contact_notification_escapes_visitor_input() {
        let msg = contact_notification("owner@example.com", &contact());
        assert_eq!(msg.to, vec!["owner@example.com"]);
        assert_eq!(msg.reply_to.as_deref(), Some("eve@example.com"));
        assert!(msg.html.contains("Eve &lt;script&gt;"));
        assert!(msg.html.contains("Tom &amp; Co"));
        assert!(msg.html.contains("Line one<br>&lt;b&gt;Line two&lt;/b&gt;"));
        assert!(!msg.html.contains("<script>"));
        // Phone is absent and therefore not listed
        assert!(!msg.html.contains("Phone"));
    }

    #[test]
    fn contact_acknowledgement_goes_to_visitor() {
        let site = SiteSettings {
            contact_email: "studio@example.com".to_string(),
            ..SiteSettings::default()
        };
        let msg = contact_acknowledgement(&contact(), &site);
        assert_eq!(msg.to, vec!["eve@example.com"]);
        assert_eq!(msg.reply_to.as_deref(), Some("studio@example.com"));

        // No reply-to until the owner has saved a contact address
        let unset = contact_acknowledgement(&contact(), &SiteSettings::default());
        assert_eq!(unset.reply_to, None);
    }

    #[test]
    fn estimate_messages_include_range() {
        let msg = estimate_notification("owner@example.com", &estimate());
        assert!(msg.subject.contains("9,850.00 EUR - 20,500.00 EUR"));
        assert!(msg.html.contains("User accounts, Seo"));
        assert!(msg.html.contains("Web app"));

        let ack = estimate_acknowledgement(&estimate(), &SiteSettings::default());
        assert_eq!(ack.to, vec!["sam@example.com"]);
        assert!(ack.html.contains("web app project"));
    }

    #[test]
    fn quotation_email_carries_link_and_pdf() {
        let q = quotation(QuotationStatus::Draft);
        let link = test_settings().shared_quotation_url(&q.share_token);
        let msg = quotation_email(
            &q,
            &SiteSettings::default(),
            &link,
            b"%PDF-1.4".to_vec(),
            "Q-2024-0003.pdf".to_string(),
        );
        assert_eq!(msg.to, vec!["ana@client.test"]);
        assert!(msg.html.contains("https://folio.example.com/q/abc"));
        assert!(msg.html.contains("1,500.00 EUR"));
        assert!(msg.html.contains("valid until 2024-05-01"));
        assert_eq!(msg.attachments.len(), 1);
        assert_eq!(msg.attachments[0].filename, "Q-2024-0003.pdf");
    }

    #[test]
    fn response_notification_names_the_verdict() {
        let msg =
            quotation_response_notification("owner@example.com", &quotation(QuotationStatus::Rejected));
        assert_eq!(msg.subject, "Quotation Q-2024-0003 declined by Ana");
        assert_eq!(msg.reply_to.as_deref(), Some("ana@client.test"));
    }

    #[test]
    fn admin_recipient_prefers_configuration() {
        let mut config = test_settings();
        let site = SiteSettings {
            contact_email: "site@example.com".to_string(),
            ..SiteSettings::default()
        };
        assert_eq!(admin_recipient(&config, &site).as_deref(), Some("owner@example.com"));

        config.admin_notification_email = None;
        assert_eq!(admin_recipient(&config, &site).as_deref(), Some("site@example.com"));

        assert_eq!(admin_recipient(&config, &SiteSettings::default()), None);
    }
}
