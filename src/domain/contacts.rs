//! Contact form submissions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::Validator;
use crate::error::ApiError;

text_enum! {
    /// Triage state of a contact inquiry
    ContactStatus (default = New) {
        New => "new",
        Read => "read",
        Replied => "replied",
        Archived => "archived",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public contact form payload
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitContactRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
}

/// Validated contact ready for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub subject: Option<String>,
    pub message: String,
}

impl SubmitContactRequest {
    pub fn validate(&self) -> Result<NewContact, ApiError> {
        let mut v = Validator::new();
        let contact = NewContact {
            name: v.text("name", &self.name, 1, 100),
            email: v.email("email", &self.email),
            phone: v.optional_text("phone", self.phone.as_deref(), 30),
            company: v.optional_text("company", self.company.as_deref(), 150),
            subject: v.optional_text("subject", self.subject.as_deref(), 200),
            message: v.text("message", &self.message, 10, 5000),
        };
        v.finish()?;
        Ok(contact)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateContactStatusRequest {
    pub status: ContactStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SubmitContactRequest {
        SubmitContactRequest {
            name: " Jane Doe ".to_string(),
            email: "Jane@Example.com".to_string(),
            phone: Some("".to_string()),
            company: Some(" Acme ".to_string()),
            subject: None,
            message: "I would like a new website for my bakery.".to_string(),
        }
    }

    #[test]
    fn valid_submission_is_normalized() {
        let contact = request().validate().unwrap();
        assert_eq!(contact.name, "Jane Doe");
        assert_eq!(contact.email, "jane@example.com");
        assert_eq!(contact.phone, None);
        assert_eq!(contact.company.as_deref(), Some("Acme"));
        assert_eq!(contact.subject, None);
    }

    #[test]
    fn message_too_short_is_rejected() {
        let mut req = request();
        req.message = "Hi".to_string();
        match req.validate() {
            Err(ApiError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "message");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn status_deserializes_from_snake_case() {
        let req: UpdateContactStatusRequest =
            serde_json::from_str(r#"{"status":"replied"}"#).unwrap();
        assert_eq!(req.status, ContactStatus::Replied);
        assert!(serde_json::from_str::<UpdateContactStatusRequest>(r#"{"status":"spam"}"#).is_err());
    }
}
