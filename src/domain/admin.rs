//! Admin user domain types
//!
//! Password hashes live only in the database; these types never carry one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::validation::Validator;
use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

/// Back-office operator
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub admin: AdminUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAdminRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAdminRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

fn check_password(v: &mut Validator, field: &str, password: &str) {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        v.add(
            field,
            format!("must be at least {} characters", MIN_PASSWORD_LEN),
        );
    } else if len > MAX_PASSWORD_LEN {
        v.add(
            field,
            format!("must be at most {} characters", MAX_PASSWORD_LEN),
        );
    }
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut v = Validator::new();
        check_password(&mut v, "new_password", &self.new_password);
        v.check(
            self.new_password != self.current_password,
            "new_password",
            "must differ from the current password",
        );
        v.finish()
    }
}

impl CreateAdminRequest {
    /// Returns the normalized (email, full name)
    pub fn validate(&self) -> Result<(String, String), ApiError> {
        let mut v = Validator::new();
        let email = v.email("email", &self.email);
        let full_name = v.text("full_name", &self.full_name, 1, 100);
        check_password(&mut v, "password", &self.password);
        v.finish()?;
        Ok((email, full_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_admin_normalizes_email() {
        let req = CreateAdminRequest {
            email: "  Owner@Example.COM ".to_string(),
            password: "correct horse".to_string(),
            full_name: " Site Owner ".to_string(),
        };
        let (email, name) = req.validate().unwrap();
        assert_eq!(email, "owner@example.com");
        assert_eq!(name, "Site Owner");
    }

    #[test]
    fn short_password_is_rejected() {
        let req = CreateAdminRequest {
            email: "owner@example.com".to_string(),
            password: "short".to_string(),
            full_name: "Owner".to_string(),
        };
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn new_password_must_change() {
        let req = ChangePasswordRequest {
            current_password: "same-password".to_string(),
            new_password: "same-password".to_string(),
        };
        assert!(req.validate().is_err());

        let req = ChangePasswordRequest {
            current_password: "old-password".to_string(),
            new_password: "new-password".to_string(),
        };
        assert!(req.validate().is_ok());
    }
}
