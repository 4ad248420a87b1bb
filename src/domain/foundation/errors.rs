//! Error types for the domain layer.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use thiserror::Error;

use super::ids::NotificationId;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::EmptyField { field } => field,
            ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ValidationFailed,
    NotificationNotFound,
    InvalidStateTransition,
    Unauthorized,
    Forbidden,
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    /// Wire form, as used in HTTP error bodies.
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::NotificationNotFound => "NOTIFICATION_NOT_FOUND",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard domain error with code, message, and optional details.
///
/// This is the error shape every port returns.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a validation error for a specific field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message).with_detail("field", field.into())
    }

    /// No notification with `id`; the id is kept under the `id` detail.
    pub fn notification_not_found(id: &NotificationId) -> Self {
        Self::new(
            ErrorCode::NotificationNotFound,
            format!("Notification not found: {}", id),
        )
        .with_detail("id", id.to_string())
    }

    /// A storage call failed; `context` says what was being attempted.
    pub fn database(context: &str, cause: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, format!("{}: {}", context, cause))
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        let field = err.field().to_string();
        DomainError::validation(field, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_name_the_field() {
        let empty = ValidationError::empty_field("title");
        let malformed = ValidationError::invalid_format("user_id", "not a uuid");

        assert_eq!(empty.to_string(), "Field 'title' cannot be empty");
        assert_eq!(malformed.field(), "user_id");
        assert!(malformed.to_string().ends_with("not a uuid"));
    }

    #[test]
    fn domain_error_displays_code_and_message() {
        let err = DomainError::new(ErrorCode::Forbidden, "Not yours");
        assert_eq!(err.to_string(), "[FORBIDDEN] Not yours");
    }

    #[test]
    fn not_found_carries_the_id() {
        let id = NotificationId::new();
        let err = DomainError::notification_not_found(&id);

        assert_eq!(err.code, ErrorCode::NotificationNotFound);
        assert_eq!(err.details.get("id"), Some(&id.to_string()));
    }

    #[test]
    fn database_error_prefixes_context() {
        let err = DomainError::database("Failed to insert notification", "pool timed out");

        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Failed to insert notification: pool timed out");
    }

    #[test]
    fn domain_error_from_validation_keeps_field() {
        let err: DomainError = ValidationError::empty_field("message").into();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.details.get("field"), Some(&"message".to_string()));
    }
}
