use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::quotations::MONEY_LIMIT;
use super::validation::Validator;
use super::{nullable, patched, Patch};
use crate::error::ApiError;

text_enum! {
    /// Project status enum
    ProjectStatus (default = Planning) {
        Planning => "planning",
        InProgress => "in_progress",
        Review => "review",
        Completed => "completed",
        OnHold => "on_hold",
        Cancelled => "cancelled",
    }
}

impl ProjectStatus {
    /// Counted as ongoing work on the dashboard
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Planning | Self::InProgress | Self::Review)
    }
}

/// Project entity with task counters
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub budget: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub quotation_id: Option<Uuid>,
    pub task_count: i64,
    pub completed_task_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Percentage of completed tasks, 0 when there are none
    pub fn progress(&self) -> u8 {
        if self.task_count <= 0 {
            return 0;
        }
        ((self.completed_task_count * 100) / self.task_count).clamp(0, 100) as u8
    }
}

/// Request DTO for creating a project
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub budget: Option<Decimal>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Request DTO for updating a project; `null` clears an optional field
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub client_name: Patch<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub client_email: Patch<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Patch<String>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub budget: Patch<Decimal>,
    #[serde(default, deserialize_with = "nullable")]
    pub start_date: Patch<NaiveDate>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Patch<NaiveDate>,
}

fn check_common(
    v: &mut Validator,
    client_email: Option<&str>,
    budget: Option<Decimal>,
    start_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
) -> Option<String> {
    let email = client_email
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(|e| v.email("client_email", e));
    if let Some(budget) = budget {
        v.check(budget >= Decimal::ZERO, "budget", "must not be negative");
        v.check(budget < MONEY_LIMIT, "budget", "is too large");
    }
    if let (Some(start), Some(due)) = (start_date, due_date) {
        v.check(due >= start, "due_date", "must not be before the start date");
    }
    email
}

impl CreateProjectRequest {
    pub fn validate(mut self) -> Result<Self, ApiError> {
        let mut v = Validator::new();
        self.name = v.text("name", &self.name, 1, 200);
        self.client_name = v.optional_text("client_name", self.client_name.as_deref(), 150);
        self.description = v.optional_text("description", self.description.as_deref(), 5000);
        self.client_email = check_common(
            &mut v,
            self.client_email.as_deref(),
            self.budget,
            self.start_date,
            self.due_date,
        );
        v.finish()?;
        Ok(self)
    }
}

impl UpdateProjectRequest {
    /// Merge onto the stored project, producing a full request to validate
    pub fn merge(self, existing: &Project) -> CreateProjectRequest {
        CreateProjectRequest {
            name: self.name.unwrap_or_else(|| existing.name.clone()),
            client_name: patched(self.client_name, &existing.client_name),
            client_email: patched(self.client_email, &existing.client_email),
            description: patched(self.description, &existing.description),
            status: self.status.unwrap_or(existing.status),
            budget: patched(self.budget, &existing.budget),
            start_date: patched(self.start_date, &existing.start_date),
            due_date: patched(self.due_date, &existing.due_date),
        }
    }
}
