//! Contact form routes
//!
//! Public submission plus the back-office inbox.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::settings::settings_for_email;
use crate::api::{Created, DataResponse, NoContent, Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::RequireAdmin;
use crate::domain::contacts::{
    Contact, ContactStatus, SubmitContactRequest, UpdateContactStatusRequest,
};
use crate::domain::ListFilter;
use crate::error::ApiError;
use crate::services::cache::keys;
use crate::services::mailer;

const CONTACT_COLUMNS: &str =
    "id, name, email, phone, company, subject, message, status, created_at, updated_at";

/// Database row for contact
#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    company: Option<String>,
    subject: Option<String>,
    message: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ContactRow> for Contact {
    fn from(row: ContactRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            company: row.company,
            subject: row.subject,
            message: row.message,
            status: ContactStatus::from_db(&row.status),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContactReceipt {
    pub id: Uuid,
    pub message: &'static str,
}

/// POST /contacts
///
/// Stores the inquiry, then emails the owner and the visitor in the background.
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new = req.validate()?;

    let contact: Contact = sqlx::query_as::<_, ContactRow>(&format!(
        r#"
        INSERT INTO contacts (name, email, phone, company, subject, message)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {}
        "#,
        CONTACT_COLUMNS
    ))
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.phone)
    .bind(&new.company)
    .bind(&new.subject)
    .bind(&new.message)
    .fetch_one(&state.db)
    .await?
    .into();

    tracing::info!(contact_id = %contact.id, "Contact message received");

    state.cache.invalidate(keys::RECORD_DERIVED).await;

    let site = settings_for_email(&state).await;
    match mailer::admin_recipient(&state.settings, &site) {
        Some(admin_to) => mailer::deliver_in_background(
            &state.email,
            mailer::contact_notification(&admin_to, &contact),
            "contact_notification",
        ),
        None => tracing::warn!("No admin notification address configured"),
    }
    mailer::deliver_in_background(
        &state.email,
        mailer::contact_acknowledgement(&contact, &site),
        "contact_acknowledgement",
    );

    Ok(Created(ContactReceipt {
        id: contact.id,
        message: "Thank you, your message has been received",
    }))
}

/// GET /admin/contacts
pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<ListFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let status = filter
        .parsed_status(ContactStatus::parse)?
        .map(|s| s.as_str());
    let search = filter.search_pattern();

    const WHERE: &str = r#"
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR name ILIKE $2 OR email ILIKE $2 OR subject ILIKE $2)
    "#;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM contacts {}", WHERE))
        .bind(status)
        .bind(&search)
        .fetch_one(&state.db)
        .await?;

    let rows = sqlx::query_as::<_, ContactRow>(&format!(
        "SELECT {} FROM contacts {} ORDER BY created_at DESC LIMIT $3 OFFSET $4",
        CONTACT_COLUMNS, WHERE
    ))
    .bind(status)
    .bind(&search)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.db)
    .await?;

    let contacts: Vec<Contact> = rows.into_iter().map(Contact::from).collect();

    Ok(Paginated::new(contacts, &pagination, total))
}

/// GET /admin/contacts/:id
pub async fn get_contact(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(contact_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let contact: Contact = sqlx::query_as::<_, ContactRow>(&format!(
        "SELECT {} FROM contacts WHERE id = $1",
        CONTACT_COLUMNS
    ))
    .bind(contact_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Contact not found"))?
    .into();

    Ok(Json(DataResponse::new(contact)))
}

/// PATCH /admin/contacts/:id/status
pub async fn update_contact_status(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Path(contact_id): Path<Uuid>,
    Json(req): Json<UpdateContactStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let contact: Contact = sqlx::query_as::<_, ContactRow>(&format!(
        "UPDATE contacts SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
        CONTACT_COLUMNS
    ))
    .bind(contact_id)
    .bind(req.status.as_str())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Contact not found"))?
    .into();

    state.cache.invalidate(keys::RECORD_DERIVED).await;

    tracing::info!(
        admin_id = %admin.admin_id,
        contact_id = %contact.id,
        status = %contact.status,
        "Contact status updated"
    );

    Ok(Json(DataResponse::new(contact)))
}

/// DELETE /admin/contacts/:id
pub async fn delete_contact(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Path(contact_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
        .bind(contact_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Contact not found"));
    }

    state.cache.invalidate(keys::RECORD_DERIVED).await;

    tracing::info!(admin_id = %admin.admin_id, contact_id = %contact_id, "Contact deleted");

    Ok(NoContent)
}
