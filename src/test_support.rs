//! Router harness for handler tests backed by PostgreSQL and Redis.
//!
//! Tests using it are `#[ignore]`d by default; run them with
//! `DATABASE_URL=... REDIS_URL=... cargo test -- --ignored`.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use crate::app::AppState;
use crate::auth::SessionSigner;
use crate::config::test_settings;
use crate::domain::admin::AdminUser;
use crate::routes;
use crate::services::cache::keys;
use crate::services::{EmailClient, RedisCache};

pub struct TestApp {
    pub state: Arc<AppState>,
    router: Router,
}

impl TestApp {
    /// Full API router with email going to `email_api_url`
    pub async fn new(pool: PgPool, email_api_url: &str) -> Self {
        let mut settings = test_settings();
        settings.email_api_url = email_api_url.to_string();
        settings.email_api_key = Some("re_test".to_string());
        if let Ok(url) = std::env::var("REDIS_URL") {
            settings.redis_url = url;
        }

        let cache = RedisCache::new(&settings.redis_url, 60).await.unwrap();
        cache
            .invalidate(&[keys::SITE_SETTINGS, keys::DASHBOARD_STATS])
            .await;

        let email = EmailClient::from_settings(&settings)
            .unwrap()
            .with_retry_window(Duration::from_millis(300));
        let sessions = SessionSigner::new(
            &settings.admin_jwt_secret,
            settings.admin_jwt_issuer.clone(),
            3600,
        );

        let state = AppState::new(pool, settings, sessions, cache, email);
        let router = routes::api_router().with_state(state.clone());
        Self { state, router }
    }

    pub async fn create_admin(&self, email: &str, password: &str) -> AdminUser {
        sqlx::query_as::<_, AdminUser>(
            "SELECT id, email, full_name, is_active, last_login_at, created_at FROM create_admin_user($1, $2, $3)",
        )
        .bind(email)
        .bind(password)
        .bind("Studio Owner")
        .fetch_one(&self.state.db)
        .await
        .unwrap()
    }

    /// Bearer token of a freshly created admin
    pub async fn admin_token(&self) -> String {
        let admin = self.create_admin("owner@studio.test", "correct horse").await;
        self.state.sessions.issue(&admin).unwrap().token
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}
