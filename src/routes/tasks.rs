//! Task routes
//!
//! Tasks live under a project; the cross-project list powers the admin
//! to-do view.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, NoContent, Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::RequireAdmin;
use crate::domain::tasks::{
    CreateTaskRequest, Task, TaskFilter, TaskPriority, TaskStatus, UpdateTaskRequest,
};
use crate::error::ApiError;
use crate::services::cache::keys;

const TASK_SELECT: &str = r#"
    SELECT t.id, t.project_id, p.name AS project_name, t.title, t.description, t.status,
           t.priority, t.due_date, t.position, t.created_at, t.updated_at
    FROM tasks t
    JOIN projects p ON p.id = t.project_id
"#;

/// Database row for task
#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    project_id: Uuid,
    project_name: Option<String>,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    due_date: Option<NaiveDate>,
    position: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            project_name: row.project_name,
            title: row.title,
            description: row.description,
            status: TaskStatus::from_db(&row.status),
            priority: TaskPriority::from_db(&row.priority),
            due_date: row.due_date,
            position: row.position,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    #[serde(flatten)]
    pub task: Task,
    pub overdue: bool,
}

impl From<TaskRow> for TaskResponse {
    fn from(row: TaskRow) -> Self {
        let task = Task::from(row);
        Self {
            overdue: task.is_overdue(Utc::now().date_naive()),
            task,
        }
    }
}

async fn fetch_task(state: &AppState, task_id: Uuid) -> Result<TaskResponse, ApiError> {
    let row = sqlx::query_as::<_, TaskRow>(&format!("{} WHERE t.id = $1", TASK_SELECT))
        .bind(task_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    Ok(row.into())
}

async fn ensure_project_exists(state: &AppState, project_id: Uuid) -> Result<(), ApiError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM projects WHERE id = $1)")
        .bind(project_id)
        .fetch_one(&state.db)
        .await?;

    if exists {
        Ok(())
    } else {
        Err(ApiError::not_found("Project not found"))
    }
}

/// GET /admin/projects/:id/tasks
///
/// Tasks of one project in board order.
pub async fn list_project_tasks(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_project_exists(&state, project_id).await?;

    let rows = sqlx::query_as::<_, TaskRow>(&format!(
        "{} WHERE t.project_id = $1 ORDER BY t.position, t.created_at",
        TASK_SELECT
    ))
    .bind(project_id)
    .fetch_all(&state.db)
    .await?;

    let tasks: Vec<TaskResponse> = rows.into_iter().map(TaskResponse::from).collect();

    Ok(Json(DataResponse::new(tasks)))
}

/// POST /admin/projects/:id/tasks
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let req = req.validate()?;
    ensure_project_exists(&state, project_id).await?;

    let task_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO tasks (project_id, title, description, status, priority, due_date, position)
        VALUES (
            $1, $2, $3, $4, $5, $6,
            COALESCE($7, (SELECT COALESCE(MAX(position) + 1, 0) FROM tasks WHERE project_id = $1))
        )
        RETURNING id
        "#,
    )
    .bind(project_id)
    .bind(&req.title)
    .bind(&req.description)
    .bind(req.status.as_str())
    .bind(req.priority.as_str())
    .bind(req.due_date)
    .bind(req.position)
    .fetch_one(&state.db)
    .await?;

    state.cache.invalidate(keys::RECORD_DERIVED).await;

    tracing::info!(
        admin_id = %admin.admin_id,
        project_id = %project_id,
        task_id = %task_id,
        "Task created"
    );

    let task = fetch_task(&state, task_id).await?;
    Ok(Created(task))
}

/// GET /admin/tasks
///
/// Open work across every project, most urgent first.
pub async fn list_all_tasks(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<TaskFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let status = filter.status.map(|s| s.as_str());
    let priority = filter.priority.map(|p| p.as_str());
    let overdue_only = filter.overdue.unwrap_or(false);

    const WHERE: &str = r#"
        WHERE ($1::text IS NULL OR t.status = $1)
          AND ($2::text IS NULL OR t.priority = $2)
          AND (NOT $3 OR (t.status <> 'done' AND t.due_date < CURRENT_DATE))
    "#;

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM tasks t {}",
        WHERE
    ))
    .bind(status)
    .bind(priority)
    .bind(overdue_only)
    .fetch_one(&state.db)
    .await?;

    let rows = sqlx::query_as::<_, TaskRow>(&format!(
        r#"
        {} {}
        ORDER BY t.due_date ASC NULLS LAST,
                 CASE t.priority WHEN 'urgent' THEN 0 WHEN 'high' THEN 1 WHEN 'medium' THEN 2 ELSE 3 END,
                 t.created_at
        LIMIT $4 OFFSET $5
        "#,
        TASK_SELECT, WHERE
    ))
    .bind(status)
    .bind(priority)
    .bind(overdue_only)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.db)
    .await?;

    let tasks: Vec<TaskResponse> = rows.into_iter().map(TaskResponse::from).collect();

    Ok(Paginated::new(tasks, &pagination, total))
}

/// GET /admin/tasks/:id
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let task = fetch_task(&state, task_id).await?;
    Ok(Json(DataResponse::new(task)))
}

/// PATCH /admin/tasks/:id
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = fetch_task(&state, task_id).await?;
    let task = req.merge(&existing.task).validate()?;

    sqlx::query(
        r#"
        UPDATE tasks
        SET title = $2, description = $3, status = $4, priority = $5,
            due_date = $6, position = COALESCE($7, position), updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(task_id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status.as_str())
    .bind(task.priority.as_str())
    .bind(task.due_date)
    .bind(task.position)
    .execute(&state.db)
    .await?;

    state.cache.invalidate(keys::RECORD_DERIVED).await;

    tracing::info!(admin_id = %admin.admin_id, task_id = %task_id, "Task updated");

    let task = fetch_task(&state, task_id).await?;
    Ok(Json(DataResponse::new(task)))
}

/// DELETE /admin/tasks/:id
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(task_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Task not found"));
    }

    state.cache.invalidate(keys::RECORD_DERIVED).await;

    tracing::info!(admin_id = %admin.admin_id, task_id = %task_id, "Task deleted");

    Ok(NoContent)
}
