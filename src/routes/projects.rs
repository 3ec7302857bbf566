//! Project routes
//!
//! Client projects tracked in the back office, optionally started from an
//! accepted quotation.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, NoContent, Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::RequireAdmin;
use crate::db;
use crate::domain::projects::{CreateProjectRequest, Project, ProjectStatus, UpdateProjectRequest};
use crate::domain::ListFilter;
use crate::error::ApiError;
use crate::services::cache::keys;

const PROJECT_SELECT: &str = r#"
    SELECT p.id, p.name, p.client_name, p.client_email, p.description, p.status,
           p.budget, p.start_date, p.due_date, p.quotation_id, p.created_at, p.updated_at,
           (SELECT COUNT(*) FROM tasks t WHERE t.project_id = p.id) AS task_count,
           (SELECT COUNT(*) FROM tasks t WHERE t.project_id = p.id AND t.status = 'done')
               AS completed_task_count
    FROM projects p
"#;

/// Database row for project
#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    name: String,
    client_name: Option<String>,
    client_email: Option<String>,
    description: Option<String>,
    status: String,
    budget: Option<Decimal>,
    start_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    quotation_id: Option<Uuid>,
    task_count: i64,
    completed_task_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            client_name: row.client_name,
            client_email: row.client_email,
            description: row.description,
            status: ProjectStatus::from_db(&row.status),
            budget: row.budget,
            start_date: row.start_date,
            due_date: row.due_date,
            quotation_id: row.quotation_id,
            task_count: row.task_count,
            completed_task_count: row.completed_task_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Project with its completion percentage
#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    #[serde(flatten)]
    pub project: Project,
    pub progress: u8,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            progress: project.progress(),
            project,
        }
    }
}

async fn fetch_project(state: &AppState, project_id: Uuid) -> Result<Project, ApiError> {
    let row = sqlx::query_as::<_, ProjectRow>(&format!("{} WHERE p.id = $1", PROJECT_SELECT))
        .bind(project_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    Ok(row.into())
}

/// POST /admin/projects
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Json(req): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let req = req.validate()?;

    let project_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO projects (name, client_name, client_email, description, status, budget, start_date, due_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(&req.name)
    .bind(&req.client_name)
    .bind(&req.client_email)
    .bind(&req.description)
    .bind(req.status.as_str())
    .bind(req.budget)
    .bind(req.start_date)
    .bind(req.due_date)
    .fetch_one(&state.db)
    .await?;

    state.cache.invalidate(keys::RECORD_DERIVED).await;

    tracing::info!(
        admin_id = %admin.admin_id,
        project_id = %project_id,
        project_name = %req.name,
        "Project created"
    );

    let project = fetch_project(&state, project_id).await?;
    Ok(Created(ProjectResponse::from(project)))
}

/// POST /admin/quotations/:id/project
///
/// Starts a project from an accepted quotation, copying client, title and total.
pub async fn create_project_from_quotation(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Path(quotation_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    #[derive(sqlx::FromRow)]
    struct AcceptedQuotation {
        status: String,
        client_name: String,
        client_email: String,
        title: String,
        description: Option<String>,
        total: Decimal,
    }

    let quotation = sqlx::query_as::<_, AcceptedQuotation>(
        "SELECT status, client_name, client_email, title, description, total FROM quotations WHERE id = $1",
    )
    .bind(quotation_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Quotation not found"))?;

    if quotation.status != "accepted" {
        return Err(ApiError::conflict(
            "Only accepted quotations can be turned into projects",
        ));
    }

    let existing: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM projects WHERE quotation_id = $1 LIMIT 1")
            .bind(quotation_id)
            .fetch_optional(&state.db)
            .await?;
    if let Some(project_id) = existing {
        return Err(ApiError::conflict(format!(
            "Project {} already exists for this quotation",
            project_id
        )));
    }

    let project_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO projects (name, client_name, client_email, description, status, budget, start_date, quotation_id)
        VALUES ($1, $2, $3, $4, 'planning', $5, CURRENT_DATE, $6)
        RETURNING id
        "#,
    )
    .bind(&quotation.title)
    .bind(&quotation.client_name)
    .bind(&quotation.client_email)
    .bind(&quotation.description)
    .bind(quotation.total)
    .bind(quotation_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if db::is_unique_violation(&e) {
            ApiError::conflict("A project already exists for this quotation")
        } else {
            ApiError::Database(e)
        }
    })?;

    state.cache.invalidate(keys::RECORD_DERIVED).await;

    tracing::info!(
        admin_id = %admin.admin_id,
        project_id = %project_id,
        quotation_id = %quotation_id,
        "Project created from quotation"
    );

    let project = fetch_project(&state, project_id).await?;
    Ok(Created(ProjectResponse::from(project)))
}

/// GET /admin/projects
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<ListFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let status = filter
        .parsed_status(ProjectStatus::parse)?
        .map(|s| s.as_str());
    let search = filter.search_pattern();

    const WHERE: &str = r#"
        WHERE ($1::text IS NULL OR p.status = $1)
          AND ($2::text IS NULL OR p.name ILIKE $2 OR p.client_name ILIKE $2)
    "#;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM projects p {}", WHERE))
        .bind(status)
        .bind(&search)
        .fetch_one(&state.db)
        .await?;

    let rows = sqlx::query_as::<_, ProjectRow>(&format!(
        "{} {} ORDER BY p.due_date ASC NULLS LAST, p.created_at DESC LIMIT $3 OFFSET $4",
        PROJECT_SELECT, WHERE
    ))
    .bind(status)
    .bind(&search)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.db)
    .await?;

    let projects: Vec<ProjectResponse> = rows
        .into_iter()
        .map(|row| ProjectResponse::from(Project::from(row)))
        .collect();

    Ok(Paginated::new(projects, &pagination, total))
}

/// GET /admin/projects/:id
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let project = fetch_project(&state, project_id).await?;
    Ok(Json(DataResponse::new(ProjectResponse::from(project))))
}

/// PATCH /admin/projects/:id
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = fetch_project(&state, project_id).await?;
    let project = req.merge(&existing).validate()?;

    sqlx::query(
        r#"
        UPDATE projects
        SET name = $2, client_name = $3, client_email = $4, description = $5,
            status = $6, budget = $7, start_date = $8, due_date = $9,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(project_id)
    .bind(&project.name)
    .bind(&project.client_name)
    .bind(&project.client_email)
    .bind(&project.description)
    .bind(project.status.as_str())
    .bind(project.budget)
    .bind(project.start_date)
    .bind(project.due_date)
    .execute(&state.db)
    .await?;

    state.cache.invalidate(keys::RECORD_DERIVED).await;

    tracing::info!(admin_id = %admin.admin_id, project_id = %project_id, "Project updated");

    let project = fetch_project(&state, project_id).await?;
    Ok(Json(DataResponse::new(ProjectResponse::from(project))))
}

/// DELETE /admin/projects/:id
///
/// Tasks go with the project.
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(project_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Project not found"));
    }

    state.cache.invalidate(keys::RECORD_DERIVED).await;

    tracing::info!(admin_id = %admin.admin_id, project_id = %project_id, "Project deleted");

    Ok(NoContent)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use sqlx::PgPool;
    use uuid::Uuid;

    use crate::test_support::TestApp;

    async fn accepted_quotation(app: &TestApp, token: &str) -> Uuid {
        let (status, body) = app
            .call(
                Method::POST,
                "/admin/quotations",
                Some(token),
                Some(json!({
                    "client_name": "Grace Hopper",
                    "client_email": "grace@client.test",
                    "title": "Booking system",
                    "amount": "4200.00"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        let id: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();
        sqlx::query("UPDATE quotations SET status = 'accepted', responded_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&app.state.db)
            .await
            .unwrap();
        id
    }

    #[sqlx::test]
    #[ignore = "requires PostgreSQL (DATABASE_URL) and Redis (REDIS_URL)"]
    async fn one_project_per_quotation_under_concurrent_requests(pool: PgPool) {
        let app = TestApp::new(pool, "http://127.0.0.1:9").await;
        let token = app.admin_token().await;
        let quotation_id = accepted_quotation(&app, &token).await;

        let uri = format!("/admin/quotations/{}/project", quotation_id);
        let (first, second) = tokio::join!(
            app.call(Method::POST, &uri, Some(&token), None),
            app.call(Method::POST, &uri, Some(&token), None),
        );

        let mut statuses = vec![first.0, second.0];
        statuses.sort();
        assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE quotation_id = $1")
            .bind(quotation_id)
            .fetch_one(&app.state.db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[sqlx::test]
    #[ignore = "requires PostgreSQL (DATABASE_URL) and Redis (REDIS_URL)"]
    async fn patch_with_null_clears_optional_fields(pool: PgPool) {
        let app = TestApp::new(pool, "http://127.0.0.1:9").await;
        let token = app.admin_token().await;
        let (status, body) = app
            .call(
                Method::POST,
                "/admin/projects",
                Some(&token),
                Some(json!({
                    "name": "Shop relaunch",
                    "description": "Phase one",
                    "budget": "1500.00",
                    "due_date": "2030-01-31"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = app
            .call(
                Method::PATCH,
                &format!("/admin/projects/{}", id),
                Some(&token),
                Some(json!({"description": null, "due_date": null, "name": "Shop relaunch v2"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["data"]["name"], "Shop relaunch v2");
        assert!(body["data"]["description"].is_null());
        assert!(body["data"]["due_date"].is_null());
        assert_eq!(body["data"]["budget"], "1500.00");
    }
}
