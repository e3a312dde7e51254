//! Field-scoped validation errors shared by services and forms

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

/// Letters, digits, dot, dash and underscore
pub static PSEUDO_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N}._-]+$").expect("valid pseudo regex"));

/// Error messages keyed by form field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; the first message for a field wins
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// One line listing every message, for contexts without a form
    pub fn summary(&self) -> String {
        self.0.values().cloned().collect::<Vec<_>>().join(" ")
    }

    /// `Ok(())` when empty, otherwise the errors as `AppError::Validation`
    pub fn into_result(self) -> crate::AppResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(crate::AppError::Validation(self))
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            if let Some(err) = errs.first() {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                fields.add(&field, message);
            }
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 3, message = "Too short"))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn test_from_validation_errors() {
        let sample = Sample {
            name: "ab".to_string(),
            email: "nope".to_string(),
        };
        let errors = FieldErrors::from(sample.validate().unwrap_err());
        assert_eq!(errors.get("name"), Some("Too short"));
        assert_eq!(errors.get("email"), Some("Invalid value for email"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_first_message_wins() {
        let mut errors = FieldErrors::new();
        errors.add("pseudo", "first");
        errors.add("pseudo", "second");
        assert_eq!(errors.get("pseudo"), Some("first"));
    }

    #[test]
    fn test_pseudo_regex() {
        assert!(PSEUDO_REGEX.is_match("jean_luc-42"));
        assert!(PSEUDO_REGEX.is_match("Élodie"));
        assert!(!PSEUDO_REGEX.is_match("bad name"));
        assert!(!PSEUDO_REGEX.is_match("<script>"));
    }
}
