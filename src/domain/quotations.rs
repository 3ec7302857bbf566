//! Quotations: priced proposals authored in the back office
//!
//! A quotation is either itemized (lines of quantity × unit price) or carries
//! a single lump-sum amount. Money uses `Decimal` rounded half away from zero
//! to cents.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::Validator;
use super::{nullable, patched, Patch};
use crate::error::ApiError;

text_enum! {
    QuotationStatus (default = Draft) {
        Draft => "draft",
        Sent => "sent",
        Accepted => "accepted",
        Rejected => "rejected",
        Expired => "expired",
    }
}

impl QuotationStatus {
    /// Content (items, client, amounts) can still change
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft | Self::Sent)
    }

    /// Manual status changes allowed from the back office
    pub fn can_transition_to(&self, next: QuotationStatus) -> bool {
        use QuotationStatus::*;
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Draft, Sent)
                | (Sent, Accepted)
                | (Sent, Rejected)
                | (Sent, Expired)
                | (Sent, Draft)
                | (Expired, Draft)
                | (Expired, Sent)
                | (Rejected, Draft)
        )
    }
}

pub const MAX_ITEMS: usize = 100;

/// Round to cents and pin the scale so amounts always render with two decimals
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// `1234.5` + `EUR` -> `1,234.50 EUR`
pub fn format_money(amount: Decimal, currency: &str) -> String {
    let rounded = round_money(amount);
    let text = rounded.abs().to_string();
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}{}.{} {}", sign, grouped, cents, currency)
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuotationItemInput {
    pub description: String,
    #[serde(default = "default_quantity")]
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

fn default_quantity() -> Decimal {
    Decimal::ONE
}

/// Stored line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuotationItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct QuotationTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

/// Largest quantity accepted on a line
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Money columns are `NUMERIC(12, 2)`: every amount stays below 10^10
pub const MONEY_LIMIT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

fn within_money_limit(v: &mut Validator, field: &str, value: Decimal) -> bool {
    let ok = value.abs() < MONEY_LIMIT;
    v.check(ok, field, "is too large");
    ok
}

/// Validate line items and compute every amount of the quotation.
///
/// `lump_sum` is used only when there are no items. Out-of-range inputs are
/// reported as field errors and the returned totals are then meaningless.
pub fn compute_totals(
    v: &mut Validator,
    items: &[QuotationItemInput],
    lump_sum: Option<Decimal>,
    discount: Decimal,
    tax_rate: Decimal,
) -> (Vec<QuotationItem>, QuotationTotals) {
    if items.len() > MAX_ITEMS {
        v.add("items", format!("must contain at most {} lines", MAX_ITEMS));
    }

    let mut lines = Vec::with_capacity(items.len());
    let mut subtotal = Some(Decimal::ZERO);
    for (i, item) in items.iter().enumerate() {
        let description = v.text(&format!("items[{}].description", i), &item.description, 1, 500);
        let quantity_field = format!("items[{}].quantity", i);
        let price_field = format!("items[{}].unit_price", i);

        v.check(
            item.quantity > Decimal::ZERO,
            &quantity_field,
            "must be greater than zero",
        );
        v.check(
            item.quantity <= MAX_QUANTITY,
            &quantity_field,
            "must not exceed 1000000",
        );
        v.check(
            item.unit_price >= Decimal::ZERO,
            &price_field,
            "must not be negative",
        );
        let price_ok = within_money_limit(v, &price_field, item.unit_price);

        let amount = if price_ok && item.quantity <= MAX_QUANTITY {
            item.quantity.checked_mul(item.unit_price).map(round_money)
        } else {
            None
        };
        let amount = match amount {
            Some(amount) if within_money_limit(v, &format!("items[{}]", i), amount) => amount,
            Some(_) => Decimal::ZERO,
            None => {
                subtotal = None;
                Decimal::ZERO
            }
        };
        subtotal = subtotal.and_then(|s| s.checked_add(amount));

        lines.push(QuotationItem {
            description,
            quantity: item.quantity,
            unit_price: round_money(item.unit_price),
            amount,
        });
    }

    let subtotal = if lines.is_empty() {
        match lump_sum {
            Some(amount) => {
                v.check(amount >= Decimal::ZERO, "amount", "must not be negative");
                if within_money_limit(v, "amount", amount) {
                    round_money(amount)
                } else {
                    Decimal::ZERO
                }
            }
            None => {
                v.add("items", "provide at least one line item or an amount");
                Decimal::ZERO
            }
        }
    } else {
        match subtotal {
            Some(subtotal) if within_money_limit(v, "items", subtotal) => subtotal,
            Some(_) => Decimal::ZERO,
            None => {
                v.add("items", "line amounts are out of range");
                Decimal::ZERO
            }
        }
    };

    let discount = if discount.abs() < MONEY_LIMIT {
        round_money(discount)
    } else {
        v.add("discount", "is too large");
        Decimal::ZERO
    };
    v.check(discount >= Decimal::ZERO, "discount", "must not be negative");
    v.check(
        discount <= subtotal,
        "discount",
        "must not exceed the subtotal",
    );
    let rate_ok = tax_rate >= Decimal::ZERO && tax_rate <= Decimal::ONE_HUNDRED;
    v.check(rate_ok, "tax_rate", "must be between 0 and 100");
    let tax_rate = if rate_ok { tax_rate } else { Decimal::ZERO };

    // Both operands are bounded here, so plain arithmetic cannot overflow
    let taxable = subtotal - discount.min(subtotal).max(Decimal::ZERO);
    let tax_amount = round_money(taxable * tax_rate / Decimal::ONE_HUNDRED);
    let total = round_money(taxable + tax_amount);
    within_money_limit(v, "total", total);

    (
        lines,
        QuotationTotals {
            subtotal,
            discount,
            tax_rate,
            tax_amount,
            total,
        },
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct Quotation {
    pub id: Uuid,
    pub quote_number: String,
    pub estimate_id: Option<Uuid>,
    pub client_name: String,
    pub client_email: String,
    pub client_company: Option<String>,
    pub client_address: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub items: Vec<QuotationItem>,
    #[serde(flatten)]
    pub totals: QuotationTotals,
    pub currency: String,
    pub status: QuotationStatus,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub share_token: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quotation {
    /// A sent quotation past its validity date is expired
    pub fn has_lapsed(&self, today: NaiveDate) -> bool {
        self.status == QuotationStatus::Sent && self.valid_until.is_some_and(|d| d < today)
    }

    pub fn is_itemized(&self) -> bool {
        !self.items.is_empty()
    }
}

/// Client-facing view served on the public link
#[derive(Debug, Clone, Serialize)]
pub struct SharedQuotation {
    pub quote_number: String,
    pub client_name: String,
    pub client_company: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub items: Vec<QuotationItem>,
    #[serde(flatten)]
    pub totals: QuotationTotals,
    pub currency: String,
    pub status: QuotationStatus,
    pub valid_until: Option<NaiveDate>,
    pub sent_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub can_respond: bool,
}

impl From<Quotation> for SharedQuotation {
    fn from(q: Quotation) -> Self {
        Self {
            can_respond: q.status == QuotationStatus::Sent,
            quote_number: q.quote_number,
            client_name: q.client_name,
            client_company: q.client_company,
            title: q.title,
            description: q.description,
            items: q.items,
            totals: q.totals,
            currency: q.currency,
            status: q.status,
            valid_until: q.valid_until,
            sent_at: q.sent_at,
            responded_at: q.responded_at,
            created_at: q.created_at,
        }
    }
}

/// Values taken from site settings when a request leaves them out
#[derive(Debug, Clone)]
pub struct QuotationDefaults {
    pub tax_rate: Decimal,
    pub currency: String,
    pub validity_days: u32,
    pub today: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuotationRequest {
    #[serde(default)]
    pub estimate_id: Option<Uuid>,
    pub client_name: String,
    pub client_email: String,
    #[serde(default)]
    pub client_company: Option<String>,
    #[serde(default)]
    pub client_address: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<QuotationItemInput>,
    /// Lump-sum price of a quotation without line items
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub discount: Option<Decimal>,
    #[serde(default)]
    pub tax_rate: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Validated quotation content ready to persist
#[derive(Debug, Clone)]
pub struct QuotationDraft {
    pub estimate_id: Option<Uuid>,
    pub client_name: String,
    pub client_email: String,
    pub client_company: Option<String>,
    pub client_address: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub items: Vec<QuotationItem>,
    pub totals: QuotationTotals,
    pub currency: String,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
}

fn normalize_currency(v: &mut Validator, currency: &str) -> String {
    let currency = currency.trim().to_uppercase();
    v.check(
        currency.len() == 3 && currency.chars().all(|c| c.is_ascii_alphabetic()),
        "currency",
        "must be a 3-letter ISO 4217 code",
    );
    currency
}

impl CreateQuotationRequest {
    pub fn validate(&self, defaults: &QuotationDefaults) -> Result<QuotationDraft, ApiError> {
        let mut v = Validator::new();

        let client_name = v.text("client_name", &self.client_name, 1, 150);
        let client_email = v.email("client_email", &self.client_email);
        let client_company = v.optional_text("client_company", self.client_company.as_deref(), 150);
        let client_address = v.optional_text("client_address", self.client_address.as_deref(), 500);
        let title = v.text("title", &self.title, 1, 200);
        let description = v.optional_text("description", self.description.as_deref(), 5000);
        let notes = v.optional_text("notes", self.notes.as_deref(), 5000);
        let currency = normalize_currency(
            &mut v,
            self.currency.as_deref().unwrap_or(&defaults.currency),
        );

        let (items, totals) = compute_totals(
            &mut v,
            &self.items,
            self.amount,
            self.discount.unwrap_or(Decimal::ZERO),
            self.tax_rate.unwrap_or(defaults.tax_rate),
        );

        let valid_until = self
            .valid_until
            .or_else(|| Some(defaults.today + Duration::days(i64::from(defaults.validity_days))));

        v.finish()?;

        Ok(QuotationDraft {
            estimate_id: self.estimate_id,
            client_name,
            client_email,
            client_company,
            client_address,
            title,
            description,
            items,
            totals,
            currency,
            valid_until,
            notes,
        })
    }
}

/// Partial update; omitted fields keep their stored value and `null`
/// clears the optional text fields
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateQuotationRequest {
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub client_company: Patch<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub client_address: Patch<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Patch<String>,
    #[serde(default)]
    pub items: Option<Vec<QuotationItemInput>>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub discount: Option<Decimal>,
    #[serde(default)]
    pub tax_rate: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Patch<String>,
}

impl UpdateQuotationRequest {
    /// Merge onto the stored quotation, producing a full request to validate
    pub fn merge(self, existing: &Quotation) -> CreateQuotationRequest {
        let items = self.items.unwrap_or_else(|| {
            existing
                .items
                .iter()
                .map(|i| QuotationItemInput {
                    description: i.description.clone(),
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                })
                .collect()
        });

        let amount = self.amount.or_else(|| {
            (!existing.is_itemized()).then_some(existing.totals.subtotal)
        });

        CreateQuotationRequest {
            estimate_id: existing.estimate_id,
            client_name: self.client_name.unwrap_or_else(|| existing.client_name.clone()),
            client_email: self.client_email.unwrap_or_else(|| existing.client_email.clone()),
            client_company: patched(self.client_company, &existing.client_company),
            client_address: patched(self.client_address, &existing.client_address),
            title: self.title.unwrap_or_else(|| existing.title.clone()),
            description: patched(self.description, &existing.description),
            items,
            amount,
            discount: Some(self.discount.unwrap_or(existing.totals.discount)),
            tax_rate: Some(self.tax_rate.unwrap_or(existing.totals.tax_rate)),
            currency: Some(self.currency.unwrap_or_else(|| existing.currency.clone())),
            valid_until: self.valid_until.or(existing.valid_until),
            notes: patched(self.notes, &existing.notes),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateQuotationStatusRequest {
    pub status: QuotationStatus,
}

text_enum! {
    /// Client answer given on the public link
    Decision (default = Reject) {
        Accept => "accept",
        Reject => "reject",
    }
}

impl Decision {
    pub fn resulting_status(&self) -> QuotationStatus {
        match self {
            Decision::Accept => QuotationStatus::Accepted,
            Decision::Reject => QuotationStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RespondToQuotationRequest {
    pub decision: Decision,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(description: &str, quantity: &str, unit_price: &str) -> QuotationItemInput {
        QuotationItemInput {
            description: description.to_string(),
            quantity: dec(quantity),
            unit_price: dec(unit_price),
        }
    }

    fn defaults() -> QuotationDefaults {
        QuotationDefaults {
            tax_rate: dec("20"),
            currency: "EUR".to_string(),
            validity_days: 30,
            today: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    fn request() -> CreateQuotationRequest {
        CreateQuotationRequest {
            estimate_id: None,
            client_name: "Acme Bakery".to_string(),
            client_email: "Owner@Acme.test".to_string(),
            client_company: None,
            client_address: None,
            title: "Showcase website".to_string(),
            description: None,
            items: vec![
                item("Design", "1", "1200"),
                item("Development (days)", "4.5", "450"),
            ],
            amount: None,
            discount: Some(dec("225")),
            tax_rate: None,
            currency: None,
            valid_until: None,
            notes: None,
        }
    }

    #[test]
    fn money_formatting() {
        assert_eq!(format_money(dec("1234.5"), "EUR"), "1,234.50 EUR");
        assert_eq!(format_money(dec("999"), "USD"), "999.00 USD");
        assert_eq!(format_money(dec("1000000"), "EUR"), "1,000,000.00 EUR");
        assert_eq!(format_money(dec("-42.125"), "EUR"), "-42.13 EUR");
        assert_eq!(format_money(Decimal::ZERO, "EUR"), "0.00 EUR");
    }

    #[test]
    fn itemized_totals() {
        let draft = request().validate(&defaults()).unwrap();
        // 1200 + 2025 = 3225; taxable 3000; tax 600
        assert_eq!(draft.items[1].amount, dec("2025.00"));
        assert_eq!(draft.totals.subtotal, dec("3225"));
        assert_eq!(draft.totals.tax_amount, dec("600"));
        assert_eq!(draft.totals.total, dec("3600"));
        assert_eq!(draft.currency, "EUR");
        assert_eq!(draft.client_email, "owner@acme.test");
        assert_eq!(draft.valid_until, NaiveDate::from_ymd_opt(2024, 3, 31));
    }

    #[test]
    fn lump_sum_quotation() {
        let mut req = request();
        req.items.clear();
        req.amount = Some(dec("999.999"));
        req.discount = None;
        req.tax_rate = Some(dec("0"));
        let draft = req.validate(&defaults()).unwrap();
        assert!(draft.items.is_empty());
        assert_eq!(draft.totals.subtotal, dec("1000.00"));
        assert_eq!(draft.totals.total, dec("1000.00"));
    }

    #[test]
    fn needs_items_or_amount() {
        let mut req = request();
        req.items.clear();
        req.discount = None;
        assert!(matches!(req.validate(&defaults()), Err(ApiError::Validation(_))));
    }

    fn field_errors(req: &CreateQuotationRequest) -> Vec<String> {
        match req.validate(&defaults()) {
            Err(ApiError::Validation(errors)) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {:?}", other.map(|d| d.totals)),
        }
    }

    #[test]
    fn huge_line_values_are_field_errors() {
        let mut req = request();
        req.items = vec![item("Everything", "10000000000000000000", "10000000000000000000")];
        req.discount = None;
        let fields = field_errors(&req);
        assert!(fields.contains(&"items[0].quantity".to_string()));
        assert!(fields.contains(&"items[0].unit_price".to_string()));
    }

    #[test]
    fn amounts_must_fit_money_columns() {
        let mut req = request();
        req.items = vec![item("Retainer", "1000000", "10000.01")];
        req.discount = None;
        assert_eq!(field_errors(&req), vec!["items[0]".to_string()]);

        let mut lines = request();
        lines.items = (0..2).map(|_| item("Block", "1", "6000000000")).collect();
        lines.discount = None;
        assert_eq!(field_errors(&lines), vec!["items".to_string()]);

        let mut lump = request();
        lump.items.clear();
        lump.amount = Some(dec("-79228162514264337593543950335"));
        lump.discount = Some(dec("79228162514264337593543950335"));
        let fields = field_errors(&lump);
        assert!(fields.contains(&"amount".to_string()));
        assert!(fields.contains(&"discount".to_string()));
    }

    #[test]
    fn largest_storable_total_is_accepted() {
        let mut req = request();
        req.items = vec![item("Platform", "1", "8000000000")];
        req.discount = None;
        req.tax_rate = Some(dec("20"));
        let draft = req.validate(&defaults()).unwrap();
        assert_eq!(draft.totals.total, dec("9600000000.00"));
    }

    #[test]
    fn rejects_bad_lines_and_discount() {
        let mut req = request();
        req.items = vec![item("", "0", "-5")];
        req.discount = Some(dec("10"));
        req.tax_rate = Some(dec("150"));
        match req.validate(&defaults()) {
            Err(ApiError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert!(fields.contains(&"items[0].description"));
                assert!(fields.contains(&"items[0].quantity"));
                assert!(fields.contains(&"items[0].unit_price"));
                assert!(fields.contains(&"discount"));
                assert!(fields.contains(&"tax_rate"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn rejects_bad_currency() {
        let mut req = request();
        req.currency = Some("euro".to_string());
        assert!(req.validate(&defaults()).is_err());

        req.currency = Some("usd".to_string());
        assert_eq!(req.validate(&defaults()).unwrap().currency, "USD");
    }

    fn stored(status: QuotationStatus) -> Quotation {
        let draft = request().validate(&defaults()).unwrap();
        Quotation {
            id: Uuid::new_v4(),
            quote_number: "Q-2024-0001".to_string(),
            estimate_id: None,
            client_name: draft.client_name,
            client_email: draft.client_email,
            client_company: None,
            client_address: None,
            title: draft.title,
            description: None,
            items: draft.items,
            totals: draft.totals,
            currency: draft.currency,
            status,
            valid_until: draft.valid_until,
            notes: Some("internal".to_string()),
            share_token: "token".to_string(),
            sent_at: None,
            responded_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn merge_keeps_unchanged_fields() {
        let existing = stored(QuotationStatus::Draft);
        let update = UpdateQuotationRequest {
            title: Some("Showcase website v2".to_string()),
            tax_rate: Some(dec("10")),
            ..Default::default()
        };
        let draft = update.merge(&existing).validate(&defaults()).unwrap();
        assert_eq!(draft.title, "Showcase website v2");
        assert_eq!(draft.items.len(), 2);
        assert_eq!(draft.totals.discount, dec("225"));
        assert_eq!(draft.totals.tax_amount, dec("300"));
        assert_eq!(draft.valid_until, existing.valid_until);
    }

    #[test]
    fn null_clears_optional_text() {
        let existing = stored(QuotationStatus::Sent);

        let keep: UpdateQuotationRequest = serde_json::from_str(r#"{"title":"Renamed"}"#).unwrap();
        let draft = keep.merge(&existing).validate(&defaults()).unwrap();
        assert_eq!(draft.notes.as_deref(), Some("internal"));

        let clear: UpdateQuotationRequest =
            serde_json::from_str(r#"{"notes":null,"client_company":"Acme Ltd"}"#).unwrap();
        let draft = clear.merge(&existing).validate(&defaults()).unwrap();
        assert_eq!(draft.notes, None);
        assert_eq!(draft.client_company.as_deref(), Some("Acme Ltd"));
    }

    #[test]
    fn merge_keeps_lump_sum() {
        let mut existing = stored(QuotationStatus::Draft);
        existing.items.clear();
        existing.totals.subtotal = dec("500");
        existing.totals.discount = Decimal::ZERO;
        let draft = UpdateQuotationRequest::default()
            .merge(&existing)
            .validate(&defaults())
            .unwrap();
        assert_eq!(draft.totals.subtotal, dec("500"));
    }

    #[test]
    fn lapsed_only_when_sent_and_past_validity() {
        let mut q = stored(QuotationStatus::Sent);
        let valid_until = q.valid_until.unwrap();
        assert!(!q.has_lapsed(valid_until));
        assert!(q.has_lapsed(valid_until + Duration::days(1)));

        q.status = QuotationStatus::Accepted;
        assert!(!q.has_lapsed(valid_until + Duration::days(1)));
    }

    #[test]
    fn status_transitions() {
        use QuotationStatus::*;
        assert!(Draft.can_transition_to(Sent));
        assert!(Sent.can_transition_to(Accepted));
        assert!(!Draft.can_transition_to(Accepted));
        assert!(!Accepted.can_transition_to(Draft));
        assert!(Accepted.can_transition_to(Accepted));
        assert!(Draft.is_editable());
        assert!(!Rejected.is_editable());
    }

    #[test]
    fn shared_view_hides_internal_fields() {
        let shared: SharedQuotation = stored(QuotationStatus::Sent).into();
        assert!(shared.can_respond);
        let json = serde_json::to_value(&shared).unwrap();
        assert!(json.get("notes").is_none());
        assert!(json.get("share_token").is_none());
        assert!(json.get("client_email").is_none());
        assert_eq!(json["total"], "3600.00");
    }
}
