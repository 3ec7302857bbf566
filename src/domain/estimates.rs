//! Project estimate requests submitted from the public site

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::pricing::EstimateInput;
use super::validation::Validator;
use crate::error::ApiError;

text_enum! {
    ProjectType (default = Other) {
        LandingPage => "landing_page",
        Showcase => "showcase",
        Ecommerce => "ecommerce",
        WebApp => "web_app",
        MobileApp => "mobile_app",
        Redesign => "redesign",
        Other => "other",
    }
}

text_enum! {
    /// Optional feature a visitor can tick on the estimate form
    Feature (default = ContactForm) {
        ContactForm => "contact_form",
        Blog => "blog",
        Multilingual => "multilingual",
        Seo => "seo",
        Booking => "booking",
        Payment => "payment",
        UserAccounts => "user_accounts",
        Cms => "cms",
        Analytics => "analytics",
        Newsletter => "newsletter",
    }
}

text_enum! {
    DesignLevel (default = Template) {
        Template => "template",
        Custom => "custom",
        Premium => "premium",
    }
}

text_enum! {
    Timeline (default = Standard) {
        Flexible => "flexible",
        Standard => "standard",
        Urgent => "urgent",
    }
}

text_enum! {
    EstimateStatus (default = New) {
        New => "new",
        Reviewed => "reviewed",
        Quoted => "quoted",
        Archived => "archived",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Estimate {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub project_type: ProjectType,
    pub pages: i32,
    pub features: Vec<Feature>,
    pub design_level: DesignLevel,
    pub timeline: Timeline,
    pub budget_range: Option<String>,
    pub description: Option<String>,
    pub estimated_min: Decimal,
    pub estimated_max: Decimal,
    pub currency: String,
    pub status: EstimateStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_pages() -> u32 {
    1
}

/// Scope fields shared by the preview and the submission
#[derive(Debug, Clone, Deserialize)]
pub struct EstimateScope {
    pub project_type: ProjectType,
    #[serde(default = "default_pages")]
    pub pages: u32,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub design_level: DesignLevel,
    #[serde(default)]
    pub timeline: Timeline,
}

impl EstimateScope {
    pub fn to_input(&self) -> EstimateInput {
        EstimateInput::new(
            self.project_type,
            self.pages,
            &self.features,
            self.design_level,
            self.timeline,
        )
    }
}

/// Public estimate form payload
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitEstimateRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(flatten)]
    pub scope: EstimateScope,
    #[serde(default)]
    pub budget_range: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Validated estimate request; amounts are computed separately
#[derive(Debug, Clone)]
pub struct NewEstimate {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub input: EstimateInput,
    pub budget_range: Option<String>,
    pub description: Option<String>,
}

impl SubmitEstimateRequest {
    pub fn validate(&self) -> Result<NewEstimate, ApiError> {
        let mut v = Validator::new();
        let estimate = NewEstimate {
            name: v.text("name", &self.name, 1, 100),
            email: v.email("email", &self.email),
            phone: v.optional_text("phone", self.phone.as_deref(), 30),
            company: v.optional_text("company", self.company.as_deref(), 150),
            input: self.scope.to_input(),
            budget_range: v.optional_text("budget_range", self.budget_range.as_deref(), 50),
            description: v.optional_text("description", self.description.as_deref(), 5000),
        };
        v.finish()?;
        Ok(estimate)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateEstimateStatusRequest {
    pub status: EstimateStatus,
}
