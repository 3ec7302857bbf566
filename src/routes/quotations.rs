//! Quotation routes
//!
//! Back-office authoring (CRUD, PDF export, sending by email, share link
//! rotation) and the public share link the client uses to view, download and
//! answer a quotation.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::settings::{load_site_settings, settings_for_email};
use crate::api::{
    Created, DataResponse, Disposition, NoContent, Paginated, PaginationParams, PdfFile,
};
use crate::app::AppState;
use crate::auth::RequireAdmin;
use crate::domain::quotations::{
    CreateQuotationRequest, Quotation, QuotationDefaults, QuotationDraft, QuotationItem,
    QuotationStatus, QuotationTotals, RespondToQuotationRequest, SharedQuotation,
    UpdateQuotationRequest, UpdateQuotationStatusRequest,
};
use crate::domain::settings::SiteSettings;
use crate::domain::ListFilter;
use crate::error::ApiError;
use crate::services::cache::keys;
use crate::services::email::SendOutcome;
use crate::services::{mailer, pdf};

const QUOTATION_COLUMNS: &str = r#"
    id, quote_number, estimate_id, client_name, client_email, client_company,
    client_address, title, description, items, subtotal, tax_rate, tax_amount,
    discount, total, currency, status, valid_until, notes, share_token, sent_at,
    responded_at, created_at, updated_at
"#;

/// Database row for quotation
#[derive(Debug, sqlx::FromRow)]
struct QuotationRow {
    id: Uuid,
    quote_number: String,
    estimate_id: Option<Uuid>,
    client_name: String,
    client_email: String,
    client_company: Option<String>,
    client_address: Option<String>,
    title: String,
    description: Option<String>,
    items: serde_json::Value,
    subtotal: Decimal,
    tax_rate: Decimal,
    tax_amount: Decimal,
    discount: Decimal,
    total: Decimal,
    currency: String,
    status: String,
    valid_until: Option<NaiveDate>,
    notes: Option<String>,
    share_token: String,
    sent_at: Option<DateTime<Utc>>,
    responded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<QuotationRow> for Quotation {
    type Error = ApiError;

    fn try_from(row: QuotationRow) -> Result<Self, Self::Error> {
        let items: Vec<QuotationItem> = serde_json::from_value(row.items)
            .map_err(|e| ApiError::internal(format!("Failed to parse quotation items: {}", e)))?;

        Ok(Self {
            id: row.id,
            quote_number: row.quote_number,
            estimate_id: row.estimate_id,
            client_name: row.client_name,
            client_email: row.client_email,
            client_company: row.client_company,
            client_address: row.client_address,
            title: row.title,
            description: row.description,
            items,
            totals: QuotationTotals {
                subtotal: row.subtotal,
                discount: row.discount,
                tax_rate: row.tax_rate,
                tax_amount: row.tax_amount,
                total: row.total,
            },
            currency: row.currency,
            status: QuotationStatus::from_db(&row.status),
            valid_until: row.valid_until,
            notes: row.notes,
            share_token: row.share_token,
            sent_at: row.sent_at,
            responded_at: row.responded_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn new_share_token() -> String {
    Uuid::new_v4().simple().to_string()
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn defaults_from(site: &SiteSettings) -> QuotationDefaults {
    QuotationDefaults {
        tax_rate: site.tax_rate,
        currency: site.currency.clone(),
        validity_days: site.quotation_validity_days,
        today: today(),
    }
}

fn items_json(items: &[QuotationItem]) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(items)
        .map_err(|e| ApiError::internal(format!("Failed to serialize quotation items: {}", e)))
}

async fn fetch_quotation(state: &AppState, quotation_id: Uuid) -> Result<Quotation, ApiError> {
    sqlx::query_as::<_, QuotationRow>(&format!(
        "SELECT {} FROM quotations WHERE id = $1",
        QUOTATION_COLUMNS
    ))
    .bind(quotation_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Quotation not found"))?
    .try_into()
}

/// Flip a sent quotation past its validity date to expired
async fn expire_if_lapsed(state: &AppState, quotation: Quotation) -> Result<Quotation, ApiError> {
    if !quotation.has_lapsed(today()) {
        return Ok(quotation);
    }

    let row = sqlx::query_as::<_, QuotationRow>(&format!(
        r#"
        UPDATE quotations SET status = 'expired', updated_at = NOW()
        WHERE id = $1 AND status = 'sent'
        RETURNING {}
        "#,
        QUOTATION_COLUMNS
    ))
    .bind(quotation.id)
    .fetch_optional(&state.db)
    .await?;

    match row {
        Some(row) => {
            tracing::info!(quotation_id = %quotation.id, "Quotation expired");
            state.cache.invalidate(keys::RECORD_DERIVED).await;
            row.try_into()
        }
        // Changed concurrently; reload the current state
        None => fetch_quotation(state, quotation.id).await,
    }
}

/// Quotation behind a public share link. Drafts are not shared.
async fn fetch_shared(state: &AppState, token: &str) -> Result<Quotation, ApiError> {
    let quotation: Quotation = sqlx::query_as::<_, QuotationRow>(&format!(
        "SELECT {} FROM quotations WHERE share_token = $1 AND status <> 'draft'",
        QUOTATION_COLUMNS
    ))
    .bind(token)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Quotation not found"))?
    .try_into()?;

    expire_if_lapsed(state, quotation).await
}

fn pdf_file(quotation: &Quotation, site: &SiteSettings, disposition: Disposition) -> PdfFile {
    PdfFile {
        bytes: pdf::render_quotation(quotation, site),
        filename: pdf::quotation_filename(quotation),
        disposition,
    }
}

// ============================================================================
// Back office
// ============================================================================

/// POST /admin/quotations
///
/// Linking an estimate marks it as quoted.
pub async fn create_quotation(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Json(req): Json<CreateQuotationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let site = load_site_settings(&state).await?;
    let draft: QuotationDraft = req.validate(&defaults_from(&site))?;
    let items = items_json(&draft.items)?;

    let mut tx = state.db.begin().await?;

    if let Some(estimate_id) = draft.estimate_id {
        let linked = sqlx::query(
            "UPDATE estimates SET status = 'quoted', updated_at = NOW() WHERE id = $1",
        )
        .bind(estimate_id)
        .execute(&mut *tx)
        .await?;

        if linked.rows_affected() == 0 {
            return Err(ApiError::invalid("estimate_id", "does not exist"));
        }
    }

    let quote_number: String = sqlx::query_scalar("SELECT generate_quote_number()")
        .fetch_one(&mut *tx)
        .await?;

    let quotation: Quotation = sqlx::query_as::<_, QuotationRow>(&format!(
        r#"
        INSERT INTO quotations (
            quote_number, estimate_id, client_name, client_email, client_company,
            client_address, title, description, items, subtotal, tax_rate, tax_amount,
            discount, total, currency, valid_until, notes, share_token
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        RETURNING {}
        "#,
        QUOTATION_COLUMNS
    ))
    .bind(&quote_number)
    .bind(draft.estimate_id)
    .bind(&draft.client_name)
    .bind(&draft.client_email)
    .bind(&draft.client_company)
    .bind(&draft.client_address)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(&items)
    .bind(draft.totals.subtotal)
    .bind(draft.totals.tax_rate)
    .bind(draft.totals.tax_amount)
    .bind(draft.totals.discount)
    .bind(draft.totals.total)
    .bind(&draft.currency)
    .bind(draft.valid_until)
    .bind(&draft.notes)
    .bind(new_share_token())
    .fetch_one(&mut *tx)
    .await?
    .try_into()?;

    tx.commit().await?;

    state.cache.invalidate(keys::RECORD_DERIVED).await;

    tracing::info!(
        admin_id = %admin.admin_id,
        quotation_id = %quotation.id,
        quote_number = %quotation.quote_number,
        total = %quotation.totals.total,
        "Quotation created"
    );

    Ok(Created(quotation))
}

/// GET /admin/quotations
pub async fn list_quotations(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<ListFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let status = filter
        .parsed_status(QuotationStatus::parse)?
        .map(|s| s.as_str());
    let search = filter.search_pattern();

    const WHERE: &str = r#"
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR quote_number ILIKE $2 OR client_name ILIKE $2
               OR client_email ILIKE $2 OR client_company ILIKE $2 OR title ILIKE $2)
    "#;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM quotations {}", WHERE))
        .bind(status)
        .bind(&search)
        .fetch_one(&state.db)
        .await?;

    let rows = sqlx::query_as::<_, QuotationRow>(&format!(
        "SELECT {} FROM quotations {} ORDER BY created_at DESC LIMIT $3 OFFSET $4",
        QUOTATION_COLUMNS, WHERE
    ))
    .bind(status)
    .bind(&search)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.db)
    .await?;

    let quotations = rows
        .into_iter()
        .map(Quotation::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Paginated::new(quotations, &pagination, total))
}

/// GET /admin/quotations/:id
pub async fn get_quotation(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(quotation_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let quotation = fetch_quotation(&state, quotation_id).await?;
    let quotation = expire_if_lapsed(&state, quotation).await?;
    Ok(Json(DataResponse::new(quotation)))
}

/// PATCH /admin/quotations/:id
///
/// Totals are recomputed from the merged content.
pub async fn update_quotation(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Path(quotation_id): Path<Uuid>,
    Json(req): Json<UpdateQuotationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = fetch_quotation(&state, quotation_id).await?;
    if !existing.status.is_editable() {
        return Err(ApiError::conflict(format!(
            "A quotation with status '{}' can no longer be edited",
            existing.status
        )));
    }

    let site = load_site_settings(&state).await?;
    let draft = req.merge(&existing).validate(&defaults_from(&site))?;
    let items = items_json(&draft.items)?;

    let quotation: Quotation = sqlx::query_as::<_, QuotationRow>(&format!(
        r#"
        UPDATE quotations
        SET client_name = $2, client_email = $3, client_company = $4, client_address = $5,
            title = $6, description = $7, items = $8, subtotal = $9, tax_rate = $10,
            tax_amount = $11, discount = $12, total = $13, currency = $14,
            valid_until = $15, notes = $16, updated_at = NOW()
        WHERE id = $1 AND status IN ('draft', 'sent')
        RETURNING {}
        "#,
        QUOTATION_COLUMNS
    ))
    .bind(quotation_id)
    .bind(&draft.client_name)
    .bind(&draft.client_email)
    .bind(&draft.client_company)
    .bind(&draft.client_address)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(&items)
    .bind(draft.totals.subtotal)
    .bind(draft.totals.tax_rate)
    .bind(draft.totals.tax_amount)
    .bind(draft.totals.discount)
    .bind(draft.totals.total)
    .bind(&draft.currency)
    .bind(draft.valid_until)
    .bind(&draft.notes)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::conflict("The quotation changed status while being edited"))?
    .try_into()?;

    state.cache.invalidate(keys::RECORD_DERIVED).await;

    tracing::info!(
        admin_id = %admin.admin_id,
        quotation_id = %quotation.id,
        total = %quotation.totals.total,
        "Quotation updated"
    );

    Ok(Json(DataResponse::new(quotation)))
}

/// DELETE /admin/quotations/:id
pub async fn delete_quotation(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Path(quotation_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM quotations WHERE id = $1")
        .bind(quotation_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Quotation not found"));
    }

    state.cache.invalidate(keys::RECORD_DERIVED).await;

    tracing::info!(admin_id = %admin.admin_id, quotation_id = %quotation_id, "Quotation deleted");

    Ok(NoContent)
}

/// PATCH /admin/quotations/:id/status
pub async fn update_quotation_status(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Path(quotation_id): Path<Uuid>,
    Json(req): Json<UpdateQuotationStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = fetch_quotation(&state, quotation_id).await?;
    if !existing.status.can_transition_to(req.status) {
        return Err(ApiError::conflict(format!(
            "Cannot change status from '{}' to '{}'",
            existing.status, req.status
        )));
    }

    let quotation: Quotation = sqlx::query_as::<_, QuotationRow>(&format!(
        r#"
        UPDATE quotations
        SET status = $2,
            sent_at = CASE WHEN $2 = 'sent' THEN COALESCE(sent_at, NOW()) ELSE sent_at END,
            responded_at = CASE
                WHEN $2 IN ('accepted', 'rejected') THEN COALESCE(responded_at, NOW())
                WHEN $2 = 'draft' THEN NULL
                ELSE responded_at
            END,
            updated_at = NOW()
        WHERE id = $1 AND status = $3
        RETURNING {}
        "#,
        QUOTATION_COLUMNS
    ))
    .bind(quotation_id)
    .bind(req.status.as_str())
    .bind(existing.status.as_str())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::conflict("The quotation changed status concurrently"))?
    .try_into()?;

    state.cache.invalidate(keys::RECORD_DERIVED).await;

    tracing::info!(
        admin_id = %admin.admin_id,
        quotation_id = %quotation.id,
        from = %existing.status,
        to = %quotation.status,
        "Quotation status changed"
    );

    Ok(Json(DataResponse::new(quotation)))
}

/// GET /admin/quotations/:id/pdf
pub async fn quotation_pdf(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(quotation_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let quotation = fetch_quotation(&state, quotation_id).await?;
    let site = load_site_settings(&state).await?;
    Ok(pdf_file(&quotation, &site, Disposition::Attachment))
}

/// POST /admin/quotations/:id/send
///
/// Emails the client the share link with the PDF attached, then marks the
/// quotation sent. A delivery failure leaves the status unchanged.
pub async fn send_quotation(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Path(quotation_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = fetch_quotation(&state, quotation_id).await?;
    if !existing.status.is_editable() {
        return Err(ApiError::conflict(format!(
            "A quotation with status '{}' cannot be sent",
            existing.status
        )));
    }

    let site = load_site_settings(&state).await?;
    let link = state.settings.shared_quotation_url(&existing.share_token);
    let message = mailer::quotation_email(
        &existing,
        &site,
        &link,
        pdf::render_quotation(&existing, &site),
        pdf::quotation_filename(&existing),
    );

    let outcome = state.email.send(&message).await.map_err(|e| {
        tracing::error!(quotation_id = %existing.id, error = %e, "Quotation email failed");
        ApiError::Upstream("The quotation email could not be delivered".to_string())
    })?;

    if outcome == SendOutcome::Skipped {
        tracing::warn!(quotation_id = %existing.id, "Email disabled, quotation marked sent without delivery");
    }

    let quotation: Quotation = sqlx::query_as::<_, QuotationRow>(&format!(
        r#"
        UPDATE quotations SET status = 'sent', sent_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status = $2
        RETURNING {}
        "#,
        QUOTATION_COLUMNS
    ))
    .bind(quotation_id)
    .bind(existing.status.as_str())
    .fetch_optional(&state.db)
    .await?
    // Answered or edited while the email was in flight
    .ok_or_else(|| ApiError::conflict("The quotation changed status while it was being sent"))?
    .try_into()?;

    state.cache.invalidate(keys::RECORD_DERIVED).await;

    tracing::info!(
        admin_id = %admin.admin_id,
        quotation_id = %quotation.id,
        quote_number = %quotation.quote_number,
        "Quotation sent"
    );

    Ok(Json(DataResponse::new(quotation)))
}

/// POST /admin/quotations/:id/share-link
///
/// Rotates the share token; the previous link stops working.
pub async fn regenerate_share_link(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Path(quotation_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let quotation: Quotation = sqlx::query_as::<_, QuotationRow>(&format!(
        "UPDATE quotations SET share_token = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
        QUOTATION_COLUMNS
    ))
    .bind(quotation_id)
    .bind(new_share_token())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Quotation not found"))?
    .try_into()?;

    tracing::info!(admin_id = %admin.admin_id, quotation_id = %quotation.id, "Share link rotated");

    Ok(Json(DataResponse::new(quotation)))
}

// ============================================================================
// Public share link
// ============================================================================

/// GET /q/:token
pub async fn view_shared_quotation(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let quotation = fetch_shared(&state, &token).await?;
    Ok(Json(DataResponse::new(SharedQuotation::from(quotation))))
}

/// GET /q/:token/pdf
pub async fn shared_quotation_pdf(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let quotation = fetch_shared(&state, &token).await?;
    let site = load_site_settings(&state).await?;
    Ok(pdf_file(&quotation, &site, Disposition::Inline))
}

/// POST /q/:token/respond
///
/// Accept or reject; only a sent, unexpired quotation can be answered.
pub async fn respond_to_quotation(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(req): Json<RespondToQuotationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current = fetch_shared(&state, &token).await?;
    if current.status != QuotationStatus::Sent {
        return Err(ApiError::conflict(format!(
            "This quotation is {} and can no longer be answered",
            current.status
        )));
    }

    let next = req.decision.resulting_status();
    let quotation: Quotation = sqlx::query_as::<_, QuotationRow>(&format!(
        r#"
        UPDATE quotations SET status = $2, responded_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status = 'sent'
        RETURNING {}
        "#,
        QUOTATION_COLUMNS
    ))
    .bind(current.id)
    .bind(next.as_str())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::conflict("This quotation has already been answered"))?
    .try_into()?;

    state.cache.invalidate(keys::RECORD_DERIVED).await;

    tracing::info!(
        quotation_id = %quotation.id,
        quote_number = %quotation.quote_number,
        decision = %req.decision,
        "Client answered quotation"
    );

    let site = settings_for_email(&state).await;
    match mailer::admin_recipient(&state.settings, &site) {
        Some(admin_to) => mailer::deliver_in_background(
            &state.email,
            mailer::quotation_response_notification(&admin_to, &quotation),
            "quotation_response",
        ),
        None => tracing::warn!("No admin notification address configured"),
    }

    Ok(Json(DataResponse::new(SharedQuotation::from(quotation))))
}
