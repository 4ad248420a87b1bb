//! Notification-specific errors.

use crate::domain::foundation::{DomainError, ErrorCode, NotificationId};

/// Errors surfaced by notification use cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// Notification was not found.
    NotFound(NotificationId),
    /// The notification belongs to another user.
    Forbidden,
    /// Validation failed.
    ValidationFailed { field: String, message: String },
    /// Infrastructure error.
    Infrastructure(String),
}

impl NotificationError {
    pub fn not_found(id: NotificationId) -> Self {
        NotificationError::NotFound(id)
    }
    pub fn forbidden() -> Self {
        NotificationError::Forbidden
    }
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        NotificationError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }
    pub fn infrastructure(message: impl Into<String>) -> Self {
        NotificationError::Infrastructure(message.into())
    }
    pub fn code(&self) -> ErrorCode {
        match self {
            NotificationError::NotFound(_) => ErrorCode::NotificationNotFound,
            NotificationError::Forbidden => ErrorCode::Forbidden,
            NotificationError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            NotificationError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }
    pub fn message(&self) -> String {
        match self {
            NotificationError::NotFound(id) => format!("Notification not found: {}", id),
            NotificationError::Forbidden => "Permission denied".to_string(),
            NotificationError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            NotificationError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }
}

impl std::fmt::Display for NotificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for NotificationError {}

impl From<DomainError> for NotificationError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => NotificationError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::Forbidden | ErrorCode::Unauthorized => NotificationError::Forbidden,
            ErrorCode::NotificationNotFound => match err
                .details
                .get("id")
                .and_then(|id| id.parse::<NotificationId>().ok())
            {
                Some(id) => NotificationError::NotFound(id),
                None => NotificationError::Infrastructure(err.to_string()),
            },
            _ => NotificationError::Infrastructure(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_domain_error_keeps_field_name() {
        let err: NotificationError = DomainError::validation("title", "Title is required").into();
        assert_eq!(
            err,
            NotificationError::validation("title", "Title is required")
        );
    }

    #[test]
    fn database_error_becomes_infrastructure() {
        let err: NotificationError =
            DomainError::new(ErrorCode::DatabaseError, "connection reset").into();
        assert!(matches!(err, NotificationError::Infrastructure(_)));
        assert_eq!(err.code(), ErrorCode::DatabaseError);
    }

    #[test]
    fn store_not_found_with_id_detail_maps_to_not_found() {
        let id = NotificationId::new();
        let err: NotificationError =
            DomainError::new(ErrorCode::NotificationNotFound, "gone")
                .with_detail("id", id.to_string())
                .into();
        assert_eq!(err, NotificationError::NotFound(id));
    }

    #[test]
    fn not_found_message_includes_id() {
        let id = NotificationId::new();
        let err = NotificationError::not_found(id);
        assert!(err.to_string().contains(&id.to_string()));
    }
}
