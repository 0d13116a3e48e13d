//! Core error types for Convoy RS
//!
//! Every crate maps its own errors into [`CvError`] at the boundary where a
//! message has to reach the user.

use std::collections::HashMap;
use thiserror::Error;

/// Core error type for all Convoy operations
#[derive(Error, Debug)]
pub enum CvError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Validation errors collection
#[derive(Error, Debug, Default, Clone, PartialEq, Eq)]
#[error("Validation errors: {errors:?}")]
pub struct ValidationErrors {
    /// Field-specific errors: field_name -> Vec<error_messages>
    pub errors: HashMap<String, Vec<String>>,
    /// Base errors not tied to a specific field
    pub base_errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection holding a single field error
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.base_errors.is_empty()
    }

    /// Check if there are errors for a specific field
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Get errors for a specific field
    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.errors.get(field)
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
        self.base_errors.extend(other.base_errors);
    }

    /// Messages without the field prefix, base errors first.
    ///
    /// Field order follows the field name so the output is stable.
    pub fn messages(&self) -> Vec<String> {
        let mut fields: Vec<_> = self.errors.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));

        let mut messages = self.base_errors.clone();
        for (_, field_messages) in fields {
            messages.extend(field_messages.iter().cloned());
        }
        messages
    }
}

impl CvError {
    pub fn error_code(&self) -> &'static str {
        match self {
            CvError::Validation(_) => "validation_failed",
            CvError::Config(_) => "configuration_error",
            CvError::Internal(_) => "internal_error",
        }
    }

    /// Text for a blocking notification, if the error is meant for the user.
    ///
    /// Only validation failures are shown; everything else is logged.
    pub fn user_message(&self) -> Option<String> {
        match self {
            CvError::Validation(errors) => {
                let messages = errors.messages();
                if messages.is_empty() {
                    None
                } else {
                    Some(messages.join("\n"))
                }
            }
            CvError::Config(_) | CvError::Internal(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_collect_and_merge() {
        let mut errors = ValidationErrors::new();
        assert!(errors.is_empty());

        errors.add("attachments", "is full");
        errors.add_base("Something went wrong");

        let mut other = ValidationErrors::new();
        other.add("attachments", "has an unsupported file");
        errors.merge(other);

        assert!(errors.has_error("attachments"));
        assert_eq!(errors.get("attachments").map(Vec::len), Some(2));
        assert_eq!(
            errors.messages(),
            vec![
                "Something went wrong".to_string(),
                "is full".to_string(),
                "has an unsupported file".to_string(),
            ]
        );
    }

    #[test]
    fn test_user_message_only_for_validation() {
        let err = CvError::from(ValidationErrors::single("attachments", "Too many photos"));
        assert_eq!(err.error_code(), "validation_failed");
        assert_eq!(err.user_message().as_deref(), Some("Too many photos"));

        let internal = CvError::Internal("boom".to_string());
        assert_eq!(internal.error_code(), "internal_error");
        assert!(internal.user_message().is_none());
    }

    #[test]
    fn test_empty_validation_has_no_user_message() {
        let err = CvError::Validation(ValidationErrors::new());
        assert!(err.user_message().is_none());
    }
}
