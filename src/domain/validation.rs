//! Input validation helpers
//!
//! Collects every field problem of a request so the caller gets them all in a
//! single 422 response.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{ApiError, FieldError};

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
            .expect("email regex is valid")
    })
}

pub fn is_valid_email(value: &str) -> bool {
    value.len() <= 254 && email_regex().is_match(value)
}

#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Trimmed text whose length (in characters) must be within `min..=max`
    pub fn text(&mut self, field: &str, value: &str, min: usize, max: usize) -> String {
        let value = value.trim();
        let len = value.chars().count();
        if len == 0 && min > 0 {
            self.add(field, "is required");
        } else if len < min {
            self.add(field, format!("must be at least {} characters", min));
        } else if len > max {
            self.add(field, format!("must be at most {} characters", max));
        }
        value.to_string()
    }

    /// Trimmed optional text; blank becomes None
    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) -> Option<String> {
        let value = value.map(str::trim).filter(|v| !v.is_empty())?;
        if value.chars().count() > max {
            self.add(field, format!("must be at most {} characters", max));
        }
        Some(value.to_string())
    }

    /// Trimmed, lowercased email address
    pub fn email(&mut self, field: &str, value: &str) -> String {
        let value = value.trim().to_lowercase();
        if value.is_empty() {
            self.add(field, "is required");
        } else if !is_valid_email(&value) {
            self.add(field, "must be a valid email address");
        }
        value
    }

    pub fn check(&mut self, condition: bool, field: &str, message: &str) {
        if !condition {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_email_shapes() {
        assert!(is_valid_email("jane@example.com"));
        assert!(is_valid_email("jane.doe+site@mail.example.co.uk"));
        assert!(!is_valid_email("jane@"));
        assert!(!is_valid_email("jane@example"));
        assert!(!is_valid_email("jane example@test.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn collects_all_errors() {
        let mut v = Validator::new();
        let name = v.text("name", "   ", 1, 100);
        let email = v.email("email", " Not-An-Email ");
        let message = v.text("message", "short", 10, 5000);
        assert_eq!(name, "");
        assert_eq!(email, "not-an-email");
        assert_eq!(message, "short");

        match v.finish() {
            Err(ApiError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["name", "email", "message"]);
                assert_eq!(errors[0].message, "is required");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn optional_text_drops_blank_values() {
        let mut v = Validator::new();
        assert_eq!(v.optional_text("phone", Some("   "), 30), None);
        assert_eq!(v.optional_text("phone", None, 30), None);
        assert_eq!(
            v.optional_text("phone", Some(" +33 6 12 "), 30).as_deref(),
            Some("+33 6 12")
        );
        assert!(v.is_empty());

        v.optional_text("company", Some("x".repeat(11).as_str()), 10);
        assert!(!v.is_empty());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let mut v = Validator::new();
        v.text("name", "Éloïse", 1, 6);
        assert!(v.finish().is_ok());
    }
}
