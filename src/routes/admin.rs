//! Admin session and account routes
//!
//! - Login (public) and the current admin's profile
//! - Password change, checked and stored by the database routines
//! - Admin account management

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, MessageResponse};
use crate::app::AppState;
use crate::auth::RequireAdmin;
use crate::db;
use crate::domain::admin::{
    AdminUser, ChangePasswordRequest, CreateAdminRequest, LoginRequest, LoginResponse,
    UpdateAdminRequest,
};
use crate::domain::validation::Validator;
use crate::error::ApiError;
use crate::middleware::RequestIdExt;

const ADMIN_COLUMNS: &str = "id, email, full_name, is_active, last_login_at, created_at";

async fn fetch_admin(state: &AppState, admin_id: Uuid) -> Result<AdminUser, ApiError> {
    sqlx::query_as::<_, AdminUser>(&format!(
        "SELECT {} FROM admin_users WHERE id = $1",
        ADMIN_COLUMNS
    ))
    .bind(admin_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Admin not found"))
}

// ============================================================================
// Session
// ============================================================================

/// POST /admin/login
///
/// Unknown email, wrong password and disabled account all get the same 401.
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let admin = sqlx::query_as::<_, AdminUser>(&format!(
        "SELECT {} FROM verify_admin_password($1, $2)",
        ADMIN_COLUMNS
    ))
    .bind(req.email.trim())
    .bind(&req.password)
    .fetch_optional(&state.db)
    .await?;

    let Some(admin) = admin else {
        tracing::warn!(
            email = %req.email.trim().to_lowercase(),
            request_id = %headers.request_id_or_dash(),
            "Failed admin login"
        );
        return Err(ApiError::unauthorized("Invalid email or password"));
    };

    let admin = sqlx::query_as::<_, AdminUser>(&format!(
        "UPDATE admin_users SET last_login_at = NOW() WHERE id = $1 RETURNING {}",
        ADMIN_COLUMNS
    ))
    .bind(admin.id)
    .fetch_one(&state.db)
    .await?;

    let issued = state.sessions.issue(&admin)?;

    tracing::info!(admin_id = %admin.id, "Admin logged in");

    Ok(Json(DataResponse::new(LoginResponse {
        access_token: issued.token,
        token_type: "Bearer",
        expires_at: issued.expires_at,
        admin,
    })))
}

/// GET /admin/me
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
) -> Result<impl IntoResponse, ApiError> {
    let profile = fetch_admin(&state, admin.admin_id).await?;
    Ok(Json(DataResponse::new(profile)))
}

/// PUT /admin/me/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let verified: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM verify_admin_password($1, $2)")
            .bind(&admin.email)
            .bind(&req.current_password)
            .fetch_optional(&state.db)
            .await?;

    if verified != Some(admin.admin_id) {
        return Err(ApiError::invalid(
            "current_password",
            "is incorrect",
        ));
    }

    let updated: bool = sqlx::query_scalar("SELECT set_admin_password($1, $2)")
        .bind(admin.admin_id)
        .bind(&req.new_password)
        .fetch_one(&state.db)
        .await?;

    if !updated {
        return Err(ApiError::not_found("Admin not found"));
    }

    tracing::info!(admin_id = %admin.admin_id, "Admin password changed");

    Ok(Json(MessageResponse::with_code(
        "Password updated",
        "PASSWORD_UPDATED",
    )))
}

// ============================================================================
// Admin accounts
// ============================================================================

/// GET /admin/users
pub async fn list_admins(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
) -> Result<impl IntoResponse, ApiError> {
    let admins = sqlx::query_as::<_, AdminUser>(&format!(
        "SELECT {} FROM admin_users ORDER BY created_at",
        ADMIN_COLUMNS
    ))
    .fetch_all(&state.db)
    .await?;

    Ok(Json(DataResponse::new(admins)))
}

/// POST /admin/users
pub async fn create_admin(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Json(req): Json<CreateAdminRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (email, full_name) = req.validate()?;

    let created = sqlx::query_as::<_, AdminUser>(&format!(
        "SELECT {} FROM create_admin_user($1, $2, $3)",
        ADMIN_COLUMNS
    ))
    .bind(&email)
    .bind(&req.password)
    .bind(&full_name)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if db::is_unique_violation(&e) {
            ApiError::conflict("An admin with this email already exists")
        } else {
            ApiError::Database(e)
        }
    })?;

    tracing::info!(
        created_by = %admin.admin_id,
        admin_id = %created.id,
        "Admin account created"
    );

    Ok(Created(created))
}

/// PATCH /admin/users/:id
pub async fn update_admin(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Path(admin_id): Path<Uuid>,
    Json(req): Json<UpdateAdminRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if admin_id == admin.admin_id && req.is_active == Some(false) {
        return Err(ApiError::forbidden("You cannot deactivate your own account"));
    }

    let mut v = Validator::new();
    let full_name = req
        .full_name
        .as_deref()
        .map(|name| v.text("full_name", name, 1, 100));
    v.finish()?;

    let updated = sqlx::query_as::<_, AdminUser>(&format!(
        r#"
        UPDATE admin_users
        SET full_name = COALESCE($2, full_name),
            is_active = COALESCE($3, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        ADMIN_COLUMNS
    ))
    .bind(admin_id)
    .bind(full_name)
    .bind(req.is_active)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Admin not found"))?;

    tracing::info!(
        updated_by = %admin.admin_id,
        admin_id = %updated.id,
        is_active = updated.is_active,
        "Admin account updated"
    );

    Ok(Json(DataResponse::new(updated)))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};
    use sqlx::PgPool;

    use crate::test_support::TestApp;

    async fn login(app: &TestApp, email: &str, password: &str) -> (StatusCode, Value) {
        app.call(
            Method::POST,
            "/admin/login",
            None,
            Some(json!({"email": email, "password": password})),
        )
        .await
    }

    #[sqlx::test]
    #[ignore = "requires PostgreSQL (DATABASE_URL) and Redis (REDIS_URL)"]
    async fn failed_logins_are_indistinguishable(pool: PgPool) {
        let app = TestApp::new(pool, "http://127.0.0.1:9").await;
        app.create_admin("owner@studio.test", "correct horse").await;
        let retired = app.create_admin("former@studio.test", "battery staple").await;
        sqlx::query("UPDATE admin_users SET is_active = FALSE WHERE id = $1")
            .bind(retired.id)
            .execute(&app.state.db)
            .await
            .unwrap();

        let unknown = login(&app, "nobody@studio.test", "correct horse").await;
        let wrong_password = login(&app, "owner@studio.test", "wrong").await;
        let inactive = login(&app, "former@studio.test", "battery staple").await;

        assert_eq!(unknown.0, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown, wrong_password);
        assert_eq!(unknown, inactive);
    }

    #[sqlx::test]
    #[ignore = "requires PostgreSQL (DATABASE_URL) and Redis (REDIS_URL)"]
    async fn login_is_case_insensitive_and_returns_a_usable_token(pool: PgPool) {
        let app = TestApp::new(pool, "http://127.0.0.1:9").await;
        app.create_admin("owner@studio.test", "correct horse").await;

        let (status, body) = login(&app, "  Owner@Studio.test ", "correct horse").await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["data"]["token_type"], "Bearer");

        let token = body["data"]["access_token"].as_str().unwrap();
        let (status, me) = app.call(Method::GET, "/admin/me", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["data"]["email"], "owner@studio.test");
        assert!(!me["data"]["last_login_at"].is_null());
    }
}
