//! Printable quotation layout

use chrono::NaiveDate;

use super::writer::{wrap_text, Font, Page, PdfDocument, PAGE_HEIGHT, PAGE_WIDTH};
use crate::domain::quotations::{format_money, Quotation, QuotationItem};
use crate::domain::settings::SiteSettings;

const MARGIN: f32 = 50.0;
const RIGHT: f32 = PAGE_WIDTH - MARGIN;
const TOP: f32 = PAGE_HEIGHT - MARGIN;
// Room kept free for the page footer
const BOTTOM: f32 = MARGIN + 30.0;

const BODY: f32 = 10.0;
const SMALL: f32 = 8.5;
const LINE: f32 = 14.0;

// Table columns: description on the left, numbers right-aligned at each edge
const COL_QTY_RIGHT: f32 = 345.0;
const COL_UNIT_RIGHT: f32 = 440.0;
const COL_AMOUNT_RIGHT: f32 = RIGHT;
const DESCRIPTION_WIDTH: f32 = 260.0;

fn format_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn format_quantity(quantity: rust_decimal::Decimal) -> String {
    quantity.normalize().to_string()
}

/// Cursor over the document that starts new pages as content flows down
struct Layout {
    doc: PdfDocument,
    y: f32,
    /// Repeat the table header after a page break
    in_table: bool,
}

impl Layout {
    fn new(title: &str) -> Self {
        Self {
            doc: PdfDocument::new(title),
            y: TOP,
            in_table: false,
        }
    }

    fn page(&mut self) -> &mut Page {
        self.doc.current_page()
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y - height >= BOTTOM {
            return;
        }
        self.doc.add_page();
        self.y = TOP;
        if self.in_table {
            self.table_header();
        }
    }

    fn text(&mut self, font: Font, size: f32, text: &str) {
        self.ensure_space(LINE);
        let y = self.y;
        self.page().text(MARGIN, y, font, size, text);
        self.y -= LINE;
    }

    fn paragraph(&mut self, font: Font, size: f32, text: &str, width: f32) {
        for line in wrap_text(text, font, size, width) {
            self.text(font, size, &line);
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn rule(&mut self) {
        let y = self.y + LINE / 2.0;
        self.page().line(MARGIN, y, RIGHT, y, 0.5);
    }

    fn table_header(&mut self) {
        let y = self.y;
        let page = self.page();
        page.fill_rect(MARGIN, y - 5.0, RIGHT - MARGIN, LINE + 4.0, 0.92);
        page.text(MARGIN + 4.0, y, Font::Bold, BODY, "Description");
        page.text_right(COL_QTY_RIGHT, y, Font::Bold, BODY, "Qty");
        page.text_right(COL_UNIT_RIGHT, y, Font::Bold, BODY, "Unit price");
        page.text_right(COL_AMOUNT_RIGHT - 4.0, y, Font::Bold, BODY, "Amount");
        self.y -= LINE + 8.0;
    }

    fn item_row(&mut self, item: &QuotationItem, currency: &str) {
        let lines = wrap_text(&item.description, Font::Regular, BODY, DESCRIPTION_WIDTH);
        self.ensure_space(LINE * lines.len() as f32 + 4.0);

        let y = self.y;
        let quantity = format_quantity(item.quantity);
        let unit_price = format_money(item.unit_price, currency);
        let amount = format_money(item.amount, currency);
        let page = self.page();
        page.text_right(COL_QTY_RIGHT, y, Font::Regular, BODY, &quantity);
        page.text_right(COL_UNIT_RIGHT, y, Font::Regular, BODY, &unit_price);
        page.text_right(COL_AMOUNT_RIGHT - 4.0, y, Font::Regular, BODY, &amount);

        for (i, line) in lines.iter().enumerate() {
            let line_y = y - LINE * i as f32;
            self.page().text(MARGIN + 4.0, line_y, Font::Regular, BODY, line);
        }
        self.y -= LINE * lines.len() as f32 + 4.0;
    }

    fn total_row(&mut self, label: &str, value: &str, font: Font) {
        self.ensure_space(LINE);
        let y = self.y;
        let page = self.page();
        page.text_right(COL_UNIT_RIGHT, y, font, BODY, label);
        page.text_right(COL_AMOUNT_RIGHT - 4.0, y, font, BODY, value);
        self.y -= LINE;
    }

    /// Stamp "Page n of m" on every page and serialize
    fn finish(mut self, reference: &str) -> Vec<u8> {
        let count = self.doc.page_count();
        for index in 0..count {
            if let Some(page) = self.doc.page_mut(index) {
                let label = format!("{} - Page {} of {}", reference, index + 1, count);
                page.line(MARGIN, MARGIN + 14.0, RIGHT, MARGIN + 14.0, 0.3);
                page.text_right(RIGHT, MARGIN, Font::Regular, SMALL, &label);
            }
        }
        self.doc.render()
    }
}

/// Render the client-facing quotation document.
///
/// Internal notes are never printed.
pub fn render_quotation(quotation: &Quotation, business: &SiteSettings) -> Vec<u8> {
    let currency = quotation.currency.as_str();
    let mut layout = Layout::new(&format!(
        "Quotation {} - {}",
        quotation.quote_number, business.business_name
    ));

    // Header: issuer on the left, document reference on the right
    let top = layout.y;
    {
        let page = layout.page();
        page.text(MARGIN, top, Font::Bold, 18.0, &business.business_name);
        page.text_right(RIGHT, top, Font::Bold, 16.0, "QUOTATION");
        page.text_right(RIGHT, top - 20.0, Font::Regular, BODY, &quotation.quote_number);
    }
    layout.gap(24.0);

    let mut meta = vec![format!("Date: {}", format_date(quotation.created_at.date_naive()))];
    if let Some(valid_until) = quotation.valid_until {
        meta.push(format!("Valid until: {}", format_date(valid_until)));
    }
    let meta_top = layout.y;
    for (i, line) in meta.iter().enumerate() {
        let y = meta_top - LINE * i as f32;
        layout.page().text_right(RIGHT, y, Font::Regular, BODY, line);
    }

    let mut issuer: Vec<String> = Vec::new();
    if let Some(tagline) = &business.tagline {
        issuer.push(tagline.clone());
    }
    if let Some(address) = &business.address {
        issuer.extend(address.lines().map(str::to_string));
    }
    if let Some(email) = business.notification_address() {
        issuer.push(email.to_string());
    }
    if let Some(phone) = &business.phone {
        issuer.push(phone.clone());
    }
    for line in &issuer {
        layout.text(Font::Regular, SMALL, line);
    }
    layout.y = layout.y.min(meta_top - LINE * meta.len() as f32);
    layout.gap(LINE);

    // Client block
    layout.text(Font::Bold, BODY, "Prepared for");
    layout.text(Font::Regular, BODY, &quotation.client_name);
    if let Some(company) = &quotation.client_company {
        layout.text(Font::Regular, BODY, company);
    }
    if let Some(address) = &quotation.client_address {
        for line in address.lines() {
            layout.text(Font::Regular, BODY, line);
        }
    }
    layout.text(Font::Regular, BODY, &quotation.client_email);
    layout.gap(LINE);

    layout.paragraph(Font::Bold, 13.0, &quotation.title, RIGHT - MARGIN);
    if let Some(description) = &quotation.description {
        layout.gap(2.0);
        layout.paragraph(Font::Regular, BODY, description, RIGHT - MARGIN);
    }
    layout.gap(LINE);

    // Line items
    layout.ensure_space(LINE * 3.0);
    layout.table_header();
    layout.in_table = true;
    if quotation.is_itemized() {
        for item in &quotation.items {
            layout.item_row(item, currency);
        }
    } else {
        let lump_sum = QuotationItem {
            description: quotation.title.clone(),
            quantity: rust_decimal::Decimal::ONE,
            unit_price: quotation.totals.subtotal,
            amount: quotation.totals.subtotal,
        };
        layout.item_row(&lump_sum, currency);
    }
    layout.in_table = false;

    // Totals
    layout.ensure_space(LINE * 5.0);
    layout.rule();
    let totals = quotation.totals;
    layout.total_row("Subtotal", &format_money(totals.subtotal, currency), Font::Regular);
    if !totals.discount.is_zero() {
        layout.total_row(
            "Discount",
            &format!("-{}", format_money(totals.discount, currency)),
            Font::Regular,
        );
    }
    if !totals.tax_rate.is_zero() {
        let label = format!("Tax ({}%)", totals.tax_rate.normalize());
        layout.total_row(&label, &format_money(totals.tax_amount, currency), Font::Regular);
    }
    layout.total_row("Total", &format_money(totals.total, currency), Font::Bold);
    layout.gap(LINE);

    if let Some(footer) = &business.quotation_footer {
        layout.paragraph(Font::Regular, SMALL, footer, RIGHT - MARGIN);
    }
    if let Some(legal) = &business.legal_info {
        layout.gap(4.0);
        layout.paragraph(Font::Regular, SMALL, legal, RIGHT - MARGIN);
    }

    layout.finish(&quotation.quote_number)
}

/// Attachment / download file name for a quotation
pub fn quotation_filename(quotation: &Quotation) -> String {
    let safe: String = quotation
        .quote_number
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{}.pdf", safe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quotations::{QuotationStatus, QuotationTotals};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn quotation(items: Vec<QuotationItem>) -> Quotation {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        Quotation {
            id: Uuid::new_v4(),
            quote_number: "Q-2024-0007".to_string(),
            estimate_id: None,
            client_name: "Jane (Acme) Doe".to_string(),
            client_email: "jane@acme.test".to_string(),
            client_company: Some("Acme Bakery".to_string()),
            client_address: Some("1 Rue de la Paix\n75002 Paris".to_string()),
            title: "Showcase website".to_string(),
            description: Some("Five pages with a contact form.".to_string()),
            items,
            totals: QuotationTotals {
                subtotal: dec("3225.00"),
                discount: dec("225.00"),
                tax_rate: dec("20"),
                tax_amount: dec("600.00"),
                total: dec("3600.00"),
            },
            currency: "EUR".to_string(),
            status: QuotationStatus::Sent,
            valid_until: NaiveDate::from_ymd_opt(2024, 3, 31),
            notes: Some("internal margin note".to_string()),
            share_token: "tok".to_string(),
            sent_at: None,
            responded_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn item(description: &str, amount: &str) -> QuotationItem {
        QuotationItem {
            description: description.to_string(),
            quantity: Decimal::ONE,
            unit_price: dec(amount),
            amount: dec(amount),
        }
    }

    fn business() -> SiteSettings {
        SiteSettings {
            business_name: "Studio Lumen".to_string(),
            quotation_footer: Some("Payment within 30 days.".to_string()),
            legal_info: Some("SIRET 123 456 789".to_string()),
            ..SiteSettings::default()
        }
    }

    fn render(q: &Quotation) -> String {
        String::from_utf8_lossy(&render_quotation(q, &business())).into_owned()
    }

    #[test]
    fn prints_quotation_content() {
        let pdf = render(&quotation(vec![item("Design", "1200"), item("Development", "2025")]));
        assert!(pdf.starts_with("%PDF-1.4"));
        assert!(pdf.contains("(Studio Lumen) Tj"));
        assert!(pdf.contains("(Q-2024-0007) Tj"));
        assert!(pdf.contains("(Jane \\(Acme\\) Doe) Tj"));
        assert!(pdf.contains("(Design) Tj"));
        assert!(pdf.contains("(3,600.00 EUR) Tj"));
        assert!(pdf.contains("(-225.00 EUR) Tj"));
        assert!(pdf.contains("(Tax \\(20%\\)) Tj"));
        assert!(pdf.contains("(Valid until: March 31, 2024) Tj"));
        assert!(pdf.contains("(Payment within 30 days.) Tj"));
        assert!(pdf.contains("/Count 1"));
    }

    #[test]
    fn never_prints_internal_notes() {
        let pdf = render(&quotation(vec![item("Design", "1200")]));
        assert!(!pdf.contains("internal margin note"));
    }

    #[test]
    fn lump_sum_prints_single_row() {
        let pdf = render(&quotation(Vec::new()));
        assert!(pdf.contains("(Showcase website) Tj"));
        assert!(pdf.contains("(3,225.00 EUR) Tj"));
    }

    #[test]
    fn long_quotations_break_pages() {
        let items = (0..80)
            .map(|i| item(&format!("Line item number {}", i), "10"))
            .collect();
        let pdf = render(&quotation(items));
        assert!(!pdf.contains("/Count 1 "));
        assert!(pdf.contains("Page 2 of"));
        // Header repeated on the continuation page
        assert!(pdf.matches("(Unit price) Tj").count() >= 2);
        assert!(pdf.contains("(Line item number 79) Tj"));
    }

    #[test]
    fn filename_is_sanitized() {
        let mut q = quotation(Vec::new());
        assert_eq!(quotation_filename(&q), "Q-2024-0007.pdf");
        q.quote_number = "Q/2024 01".to_string();
        assert_eq!(quotation_filename(&q), "Q_2024_01.pdf");
    }
}
