//! Notification aggregate entity.

use crate::domain::foundation::{DomainError, ErrorCode, NotificationId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Category applied when a notification is created without one.
pub const DEFAULT_NOTIFICATION_TYPE: &str = "system";

/// Notification aggregate - one message addressed to one user.
///
/// # Invariants
///
/// - `title` and `message` are non-empty
/// - `created_at` never changes after construction
/// - `read_at` is set at most once, never before `created_at`
/// - `is_read` is true exactly when `read_at` is set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    id: NotificationId,
    user_id: UserId,
    title: String,
    message: String,
    notification_type: String,
    is_read: bool,
    created_at: Timestamp,
    read_at: Option<Timestamp>,
}

impl Notification {
    /// Create a new unread notification.
    ///
    /// A missing or blank `notification_type` falls back to
    /// [`DEFAULT_NOTIFICATION_TYPE`].
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if title or message is blank
    pub fn new(
        id: NotificationId,
        user_id: UserId,
        title: impl Into<String>,
        message: impl Into<String>,
        notification_type: Option<String>,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        let title = title.into();
        let message = message.into();

        if title.trim().is_empty() {
            return Err(DomainError::validation("title", "Title is required"));
        }
        if message.trim().is_empty() {
            return Err(DomainError::validation("message", "Message is required"));
        }

        let notification_type = notification_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_NOTIFICATION_TYPE.to_string());

        Ok(Self {
            id,
            user_id,
            title,
            message,
            notification_type,
            is_read: false,
            created_at,
            read_at: None,
        })
    }

    /// Reconstitute a notification from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: NotificationId,
        user_id: UserId,
        title: String,
        message: String,
        notification_type: String,
        is_read: bool,
        created_at: Timestamp,
        read_at: Option<Timestamp>,
    ) -> Self {
        Self {
            id,
            user_id,
            title,
            message,
            notification_type,
            is_read,
            created_at,
            read_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &NotificationId {
        &self.id
    }

    /// Returns the recipient.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn notification_type(&self) -> &str {
        &self.notification_type
    }

    pub fn is_read(&self) -> bool {
        self.is_read
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn read_at(&self) -> Option<&Timestamp> {
        self.read_at.as_ref()
    }

    /// Returns true if `user_id` is the recipient.
    pub fn is_addressed_to(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Behavior
    // ─────────────────────────────────────────────────────────────────────────

    /// Mark the notification read at `at`.
    ///
    /// Returns `Ok(false)` without changing anything if it was already read.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` if `at` precedes `created_at`
    pub fn mark_read(&mut self, at: Timestamp) -> Result<bool, DomainError> {
        if self.read_at.is_some() {
            return Ok(false);
        }
        if at.is_before(&self.created_at) {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Notification cannot be read before it was created",
            ));
        }
        self.read_at = Some(at);
        self.is_read = true;
        Ok(true)
    }
}
