use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;
use crate::db;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: ServiceHealth,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    pub database: String,
    pub redis: String,
    pub email: String,
}

fn overall_status(database_ok: bool, redis_ok: bool) -> (&'static str, StatusCode) {
    match (database_ok, redis_ok) {
        (true, true) => ("healthy", StatusCode::OK),
        // Redis only backs caches, so its loss degrades but does not fail
        (true, false) => ("degraded", StatusCode::OK),
        (false, _) => ("unhealthy", StatusCode::SERVICE_UNAVAILABLE),
    }
}

/// Health check endpoint - public
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (database_ok, redis_result) =
        tokio::join!(db::health_check(&state.db), state.cache.health_check());
    let redis_ok = redis_result.is_ok();

    let (status, status_code) = overall_status(database_ok, redis_ok);
    let label = |ok: bool| String::from(if ok { "ok" } else { "error" });

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            services: ServiceHealth {
                database: label(database_ok),
                redis: label(redis_ok),
                email: if state.email.is_enabled() {
                    "configured".to_string()
                } else {
                    "disabled".to_string()
                },
            },
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_outage_is_unhealthy() {
        assert_eq!(overall_status(true, true), ("healthy", StatusCode::OK));
        assert_eq!(overall_status(true, false), ("degraded", StatusCode::OK));
        assert_eq!(
            overall_status(false, true),
            ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
        );
    }
}
