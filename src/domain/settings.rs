//! Site settings
//!
//! A single settings document: business identity shown on the public site and
//! printed on quotations, plus quotation defaults.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::validation::{is_valid_email, Validator};
use crate::error::ApiError;

fn default_true() -> bool {
    true
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_validity_days() -> u32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteSettings {
    pub business_name: String,
    #[serde(default)]
    pub tagline: Option<String>,
    pub contact_email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Registration / VAT identifiers printed on quotations
    #[serde(default)]
    pub legal_info: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Default tax rate in percent
    #[serde(default)]
    pub tax_rate: Decimal,
    #[serde(default = "default_validity_days")]
    pub quotation_validity_days: u32,
    #[serde(default)]
    pub quotation_footer: Option<String>,
    #[serde(default)]
    pub social_links: BTreeMap<String, String>,
    #[serde(default = "default_true")]
    pub available_for_work: bool,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            business_name: "Freelance Studio".to_string(),
            tagline: None,
            // Unset until the owner saves the settings
            contact_email: String::new(),
            phone: None,
            address: None,
            legal_info: None,
            currency: default_currency(),
            tax_rate: Decimal::ZERO,
            quotation_validity_days: default_validity_days(),
            quotation_footer: None,
            social_links: BTreeMap::new(),
            available_for_work: true,
        }
    }
}

impl SiteSettings {
    pub fn validate(mut self) -> Result<Self, ApiError> {
        let mut v = Validator::new();
        self.business_name = v.text("business_name", &self.business_name, 1, 150);
        self.tagline = v.optional_text("tagline", self.tagline.as_deref(), 300);
        self.contact_email = v.email("contact_email", &self.contact_email);
        self.phone = v.optional_text("phone", self.phone.as_deref(), 30);
        self.address = v.optional_text("address", self.address.as_deref(), 500);
        self.legal_info = v.optional_text("legal_info", self.legal_info.as_deref(), 500);
        self.quotation_footer =
            v.optional_text("quotation_footer", self.quotation_footer.as_deref(), 1000);

        self.currency = self.currency.trim().to_uppercase();
        v.check(
            self.currency.len() == 3 && self.currency.chars().all(|c| c.is_ascii_alphabetic()),
            "currency",
            "must be a 3-letter ISO 4217 code",
        );
        v.check(
            self.tax_rate >= Decimal::ZERO && self.tax_rate <= Decimal::ONE_HUNDRED,
            "tax_rate",
            "must be between 0 and 100",
        );
        v.check(
            (1..=365).contains(&self.quotation_validity_days),
            "quotation_validity_days",
            "must be between 1 and 365",
        );
        for (name, url) in &self.social_links {
            let parsed = url::Url::parse(url);
            v.check(
                matches!(&parsed, Ok(u) if u.scheme() == "https" || u.scheme() == "http"),
                &format!("social_links.{}", name),
                "must be an http(s) URL",
            );
        }

        v.finish()?;
        Ok(self)
    }

    /// Address admin notifications go to unless configured otherwise
    pub fn notification_address(&self) -> Option<&str> {
        Some(self.contact_email.as_str()).filter(|e| is_valid_email(e))
    }
}

/// Subset exposed to the marketing site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicSiteSettings {
    pub business_name: String,
    pub tagline: Option<String>,
    pub contact_email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub currency: String,
    pub social_links: BTreeMap<String, String>,
    pub available_for_work: bool,
}

impl From<SiteSettings> for PublicSiteSettings {
    fn from(s: SiteSettings) -> Self {
        Self {
            business_name: s.business_name,
            tagline: s.tagline,
            contact_email: s.contact_email,
            phone: s.phone,
            address: s.address,
            currency: s.currency,
            social_links: s.social_links,
            available_for_work: s.available_for_work,
        }
    }
}
