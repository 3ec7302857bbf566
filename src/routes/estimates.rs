//! Estimate routes
//!
//! The public form previews and submits a project scope; the price range is
//! always computed here, never taken from the client.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::settings::settings_for_email;
use crate::api::{Created, DataResponse, NoContent, Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::RequireAdmin;
use crate::domain::estimates::{
    DesignLevel, Estimate, EstimateScope, EstimateStatus, Feature, ProjectType,
    SubmitEstimateRequest, Timeline, UpdateEstimateStatusRequest,
};
use crate::domain::pricing::{self, EstimateBreakdown, PriceRange};
use crate::domain::ListFilter;
use crate::error::ApiError;
use crate::services::cache::keys;
use crate::services::mailer;

const ESTIMATE_COLUMNS: &str = r#"
    id, name, email, phone, company, project_type, pages, features, design_level,
    timeline, budget_range, description, estimated_min, estimated_max, currency,
    status, created_at, updated_at
"#;

/// Database row for estimate
#[derive(Debug, sqlx::FromRow)]
struct EstimateRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    company: Option<String>,
    project_type: String,
    pages: i32,
    features: serde_json::Value,
    design_level: String,
    timeline: String,
    budget_range: Option<String>,
    description: Option<String>,
    estimated_min: Decimal,
    estimated_max: Decimal,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EstimateRow> for Estimate {
    fn from(row: EstimateRow) -> Self {
        let features: Vec<Feature> = serde_json::from_value(row.features).unwrap_or_default();

        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            company: row.company,
            project_type: ProjectType::from_db(&row.project_type),
            pages: row.pages,
            features,
            design_level: DesignLevel::from_db(&row.design_level),
            timeline: Timeline::from_db(&row.timeline),
            budget_range: row.budget_range,
            description: row.description,
            estimated_min: row.estimated_min,
            estimated_max: row.estimated_max,
            currency: row.currency,
            status: EstimateStatus::from_db(&row.status),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EstimateReceipt {
    pub id: Uuid,
    pub estimated_min: Decimal,
    pub estimated_max: Decimal,
    pub currency: String,
}

/// POST /estimates/preview
///
/// Runs the calculation without storing anything.
pub async fn preview_estimate(
    Json(scope): Json<EstimateScope>,
) -> Result<Json<DataResponse<EstimateBreakdown>>, ApiError> {
    let breakdown = pricing::calculate(&scope.to_input());
    Ok(Json(DataResponse::new(breakdown)))
}

/// POST /estimates
pub async fn submit_estimate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitEstimateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new = req.validate()?;
    let PriceRange { min, max } = pricing::calculate(&new.input).total;

    let site = settings_for_email(&state).await;

    let features = serde_json::to_value(&new.input.features)
        .map_err(|e| ApiError::internal(format!("Failed to serialize features: {}", e)))?;

    let estimate: Estimate = sqlx::query_as::<_, EstimateRow>(&format!(
        r#"
        INSERT INTO estimates (
            name, email, phone, company, project_type, pages, features, design_level,
            timeline, budget_range, description, estimated_min, estimated_max, currency
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING {}
        "#,
        ESTIMATE_COLUMNS
    ))
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.phone)
    .bind(&new.company)
    .bind(new.input.project_type.as_str())
    .bind(new.input.pages as i32)
    .bind(&features)
    .bind(new.input.design_level.as_str())
    .bind(new.input.timeline.as_str())
    .bind(&new.budget_range)
    .bind(&new.description)
    .bind(min)
    .bind(max)
    .bind(&site.currency)
    .fetch_one(&state.db)
    .await?
    .into();

    tracing::info!(
        estimate_id = %estimate.id,
        project_type = %estimate.project_type,
        estimated_min = %estimate.estimated_min,
        estimated_max = %estimate.estimated_max,
        "Estimate request received"
    );

    state.cache.invalidate(keys::RECORD_DERIVED).await;

    match mailer::admin_recipient(&state.settings, &site) {
        Some(admin_to) => mailer::deliver_in_background(
            &state.email,
            mailer::estimate_notification(&admin_to, &estimate),
            "estimate_notification",
        ),
        None => tracing::warn!("No admin notification address configured"),
    }
    mailer::deliver_in_background(
        &state.email,
        mailer::estimate_acknowledgement(&estimate, &site),
        "estimate_acknowledgement",
    );

    Ok(Created(EstimateReceipt {
        id: estimate.id,
        estimated_min: estimate.estimated_min,
        estimated_max: estimate.estimated_max,
        currency: estimate.currency,
    }))
}

/// GET /admin/estimates
pub async fn list_estimates(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<ListFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let status = filter
        .parsed_status(EstimateStatus::parse)?
        .map(|s| s.as_str());
    let search = filter.search_pattern();

    const WHERE: &str = r#"
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR name ILIKE $2 OR email ILIKE $2 OR company ILIKE $2)
    "#;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM estimates {}", WHERE))
        .bind(status)
        .bind(&search)
        .fetch_one(&state.db)
        .await?;

    let rows = sqlx::query_as::<_, EstimateRow>(&format!(
        "SELECT {} FROM estimates {} ORDER BY created_at DESC LIMIT $3 OFFSET $4",
        ESTIMATE_COLUMNS, WHERE
    ))
    .bind(status)
    .bind(&search)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.db)
    .await?;

    let estimates: Vec<Estimate> = rows.into_iter().map(Estimate::from).collect();

    Ok(Paginated::new(estimates, &pagination, total))
}

/// GET /admin/estimates/:id
pub async fn get_estimate(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(estimate_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let estimate: Estimate = sqlx::query_as::<_, EstimateRow>(&format!(
        "SELECT {} FROM estimates WHERE id = $1",
        ESTIMATE_COLUMNS
    ))
    .bind(estimate_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Estimate not found"))?
    .into();

    Ok(Json(DataResponse::new(estimate)))
}

/// PATCH /admin/estimates/:id/status
pub async fn update_estimate_status(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Path(estimate_id): Path<Uuid>,
    Json(req): Json<UpdateEstimateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let estimate: Estimate = sqlx::query_as::<_, EstimateRow>(&format!(
        "UPDATE estimates SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
        ESTIMATE_COLUMNS
    ))
    .bind(estimate_id)
    .bind(req.status.as_str())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Estimate not found"))?
    .into();

    state.cache.invalidate(keys::RECORD_DERIVED).await;

    tracing::info!(
        admin_id = %admin.admin_id,
        estimate_id = %estimate.id,
        status = %estimate.status,
        "Estimate status updated"
    );

    Ok(Json(DataResponse::new(estimate)))
}

/// DELETE /admin/estimates/:id
pub async fn delete_estimate(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Path(estimate_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM estimates WHERE id = $1")
        .bind(estimate_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Estimate not found"));
    }

    state.cache.invalidate(keys::RECORD_DERIVED).await;

    tracing::info!(admin_id = %admin.admin_id, estimate_id = %estimate_id, "Estimate deleted");

    Ok(NoContent)
}
