//! Task domain types
//!
//! Project tasks for tracking work items.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::Validator;
use super::{nullable, patched, Patch};
use crate::error::ApiError;

text_enum! {
    TaskStatus (default = Todo) {
        Todo => "todo",
        InProgress => "in_progress",
        Done => "done",
    }
}

text_enum! {
    TaskPriority (default = Medium) {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

/// Task entity
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub project_name: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != TaskStatus::Done && self.due_date.is_some_and(|d| d < today)
    }
}

/// Request DTO for creating a task
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Appended after the last task when omitted
    #[serde(default)]
    pub position: Option<i32>,
}

/// Request DTO for updating a task; `null` clears the description or due date
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Patch<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Patch<NaiveDate>,
    #[serde(default)]
    pub position: Option<i32>,
}

impl CreateTaskRequest {
    pub fn validate(mut self) -> Result<Self, ApiError> {
        let mut v = Validator::new();
        self.title = v.text("title", &self.title, 1, 200);
        self.description = v.optional_text("description", self.description.as_deref(), 5000);
        if let Some(position) = self.position {
            v.check(position >= 0, "position", "must not be negative");
        }
        v.finish()?;
        Ok(self)
    }
}

impl UpdateTaskRequest {
    /// Merge onto the stored task, producing a full request to validate
    pub fn merge(self, existing: &Task) -> CreateTaskRequest {
        CreateTaskRequest {
            title: self.title.unwrap_or_else(|| existing.title.clone()),
            description: patched(self.description, &existing.description),
            status: self.status.unwrap_or(existing.status),
            priority: self.priority.unwrap_or(existing.priority),
            due_date: patched(self.due_date, &existing.due_date),
            position: Some(self.position.unwrap_or(existing.position)),
        }
    }
}

/// Filters for the cross-project task list
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskFilter {
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    /// Only tasks past their due date and not done
    #[serde(default)]
    pub overdue: Option<bool>,
}
