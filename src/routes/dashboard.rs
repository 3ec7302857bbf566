//! Back-office dashboard

use axum::{extract::State, response::IntoResponse, Json};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAdmin;
use crate::domain::dashboard::DashboardStats;
use crate::domain::projects::ProjectStatus;
use crate::domain::quotations::QuotationStatus;
use crate::error::ApiError;
use crate::services::cache::keys;

const STATS_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, sqlx::FromRow)]
struct CountersRow {
    new_contacts: i64,
    total_contacts: i64,
    new_estimates: i64,
    total_estimates: i64,
    accepted_quotation_value: Decimal,
    active_projects: i64,
    open_tasks: i64,
    overdue_tasks: i64,
    contacts_last_30_days: i64,
    estimates_last_30_days: i64,
}

async fn compute_stats(state: &AppState) -> Result<DashboardStats, ApiError> {
    let active_statuses: Vec<&str> = ProjectStatus::ALL
        .iter()
        .filter(|s| s.is_active())
        .map(|s| s.as_str())
        .collect();

    let counters = sqlx::query_as::<_, CountersRow>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM contacts WHERE status = 'new') AS new_contacts,
            (SELECT COUNT(*) FROM contacts) AS total_contacts,
            (SELECT COUNT(*) FROM estimates WHERE status = 'new') AS new_estimates,
            (SELECT COUNT(*) FROM estimates) AS total_estimates,
            (SELECT COALESCE(SUM(total), 0) FROM quotations WHERE status = 'accepted')
                AS accepted_quotation_value,
            (SELECT COUNT(*) FROM projects WHERE status = ANY($1)) AS active_projects,
            (SELECT COUNT(*) FROM tasks WHERE status <> 'done') AS open_tasks,
            (SELECT COUNT(*) FROM tasks WHERE status <> 'done' AND due_date < CURRENT_DATE)
                AS overdue_tasks,
            (SELECT COUNT(*) FROM contacts WHERE created_at >= NOW() - INTERVAL '30 days')
                AS contacts_last_30_days,
            (SELECT COUNT(*) FROM estimates WHERE created_at >= NOW() - INTERVAL '30 days')
                AS estimates_last_30_days
        "#,
    )
    .bind(&active_statuses)
    .fetch_one(&state.db)
    .await?;

    let by_status: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM quotations GROUP BY status")
            .fetch_all(&state.db)
            .await?;

    // Every status is listed, zero when absent
    let mut quotations_by_status: BTreeMap<String, i64> = QuotationStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    for (status, count) in by_status {
        *quotations_by_status.entry(status).or_insert(0) += count;
    }

    Ok(DashboardStats {
        new_contacts: counters.new_contacts,
        total_contacts: counters.total_contacts,
        new_estimates: counters.new_estimates,
        total_estimates: counters.total_estimates,
        quotations_by_status,
        accepted_quotation_value: counters.accepted_quotation_value,
        active_projects: counters.active_projects,
        open_tasks: counters.open_tasks,
        overdue_tasks: counters.overdue_tasks,
        contacts_last_30_days: counters.contacts_last_30_days,
        estimates_last_30_days: counters.estimates_last_30_days,
    })
}

/// GET /admin/dashboard
pub async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(stats) = state.cache.get::<DashboardStats>(keys::DASHBOARD_STATS).await {
        return Ok(Json(DataResponse::new(stats)));
    }

    let stats = compute_stats(&state).await?;
    state
        .cache
        .set_quietly(keys::DASHBOARD_STATS, &stats, Some(STATS_TTL))
        .await;

    Ok(Json(DataResponse::new(stats)))
}
