//! Notification store port.
//!
//! Defines the contract for persisting and retrieving notifications.
//! The delivery pipeline depends only on this narrow surface; schema and
//! query details belong to the adapters.

use crate::domain::foundation::{DomainError, NotificationId, Timestamp, UserId};
use crate::domain::notification::Notification;
use async_trait::async_trait;

/// Repository port for notification persistence.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist a new notification.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn create(&self, notification: &Notification) -> Result<(), DomainError>;

    /// Find a notification by its ID.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &NotificationId) -> Result<Option<Notification>, DomainError>;

    /// List a user's notifications, newest first.
    async fn find_by_user(
        &self,
        user_id: &UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Notification>, DomainError>;

    /// Record that a notification was read at `read_at`.
    ///
    /// An existing `read_at` is kept. Returns the stored value, which differs
    /// from `read_at` when another request marked it read first.
    ///
    /// # Errors
    ///
    /// - `NotificationNotFound` if the notification doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn mark_read(
        &self,
        id: &NotificationId,
        read_at: Timestamp,
    ) -> Result<Timestamp, DomainError>;

    /// Delete a notification.
    ///
    /// # Errors
    ///
    /// - `NotificationNotFound` if the notification doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn delete(&self, id: &NotificationId) -> Result<(), DomainError>;
}
