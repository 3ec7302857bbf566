//! Site settings routes
//!
//! One settings document shared by the marketing site, quotations and email.

use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAdmin;
use crate::domain::settings::{PublicSiteSettings, SiteSettings};
use crate::error::ApiError;
use crate::services::cache::keys;

#[derive(Debug, sqlx::FromRow)]
struct SiteSettingsRow {
    settings: serde_json::Value,
}

impl TryFrom<SiteSettingsRow> for SiteSettings {
    type Error = ApiError;

    fn try_from(row: SiteSettingsRow) -> Result<Self, Self::Error> {
        serde_json::from_value(row.settings)
            .map_err(|e| ApiError::internal(format!("Failed to parse site settings: {}", e)))
    }
}

/// Current settings: cache, then database, then built-in defaults
pub(crate) async fn load_site_settings(state: &AppState) -> Result<SiteSettings, ApiError> {
    if let Some(cached) = state.cache.get::<SiteSettings>(keys::SITE_SETTINGS).await {
        return Ok(cached);
    }

    let row = sqlx::query_as::<_, SiteSettingsRow>(
        "SELECT settings FROM site_settings WHERE id = 1",
    )
    .fetch_optional(&state.db)
    .await?;

    let settings = match row {
        Some(row) => SiteSettings::try_from(row)?,
        None => SiteSettings::default(),
    };

    state
        .cache
        .set_quietly(keys::SITE_SETTINGS, &settings, None)
        .await;

    Ok(settings)
}

/// GET /settings
///
/// Business identity for the marketing site.
pub async fn get_public_settings(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = load_site_settings(&state).await?;
    Ok(Json(DataResponse::new(PublicSiteSettings::from(settings))))
}

/// GET /admin/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
) -> Result<impl IntoResponse, ApiError> {
    let settings = load_site_settings(&state).await?;
    Ok(Json(DataResponse::new(settings)))
}

/// PUT /admin/settings
///
/// Replaces the whole document; omitted optional fields take their defaults.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Json(req): Json<SiteSettings>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = req.validate()?;

    let document = serde_json::to_value(&settings)
        .map_err(|e| ApiError::internal(format!("Failed to serialize settings: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO site_settings (id, settings, updated_at)
        VALUES (1, $1, NOW())
        ON CONFLICT (id) DO UPDATE SET settings = EXCLUDED.settings, updated_at = NOW()
        "#,
    )
    .bind(&document)
    .execute(&state.db)
    .await?;

    state.cache.invalidate(&[keys::SITE_SETTINGS]).await;

    tracing::info!(admin_id = %admin.admin_id, "Site settings updated");

    Ok(Json(DataResponse::new(settings)))
}

/// Settings for outgoing email, falling back to defaults when unavailable
pub(crate) async fn settings_for_email(state: &AppState) -> SiteSettings {
    match load_site_settings(state).await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "Using default site settings for email");
            SiteSettings::default()
        }
    }
}
