use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::auth::SessionSigner;
use crate::config::Settings;
use crate::middleware::{request_id::X_REQUEST_ID, request_id_layer};
use crate::routes;
use crate::services::{EmailClient, RedisCache};

/// Largest accepted request body (form posts and quotation payloads)
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub settings: Settings,
    /// Issues and verifies admin session tokens
    pub sessions: SessionSigner,
    pub cache: RedisCache,
    pub email: EmailClient,
}

impl AppState {
    pub fn new(
        db: PgPool,
        settings: Settings,
        sessions: SessionSigner,
        cache: RedisCache,
        email: EmailClient,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            settings,
            sessions,
            cache,
            email,
        })
    }
}

/// Build the complete application with all middleware
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.settings);

    // Spans at DEBUG keep INFO output to domain events
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let (set_request_id, propagate_request_id) = request_id_layer();

    Router::new()
        .merge(routes::api_router())
        // Middleware stack (applied bottom-up)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(propagate_request_id)
        .layer(trace_layer)
        .layer(set_request_id)
        .layer(cors)
        .with_state(state)
}

/// Browser access for the public site and the admin app
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_allow_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let preflight_max_age = if settings.env.is_dev() {
        Duration::from_secs(24 * 3600)
    } else {
        Duration::from_secs(3600)
    };

    let request_id = HeaderName::from_static(X_REQUEST_ID);

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            request_id.clone(),
        ]))
        // PDF downloads read the filename from Content-Disposition
        .expose_headers([header::CONTENT_DISPOSITION, request_id])
        .allow_credentials(true)
        .max_age(preflight_max_age)
}
