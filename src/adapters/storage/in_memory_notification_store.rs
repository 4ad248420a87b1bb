//! In-Memory Notification Store Adapter
//!
//! Holds notifications in a map. Useful for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, NotificationId, Timestamp, UserId};
use crate::domain::notification::Notification;
use crate::ports::NotificationStore;

/// In-memory storage for notifications
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationStore {
    notifications: Arc<RwLock<HashMap<NotificationId, Notification>>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryNotificationStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose writes all fail with `DatabaseError`
    pub fn failing() -> Self {
        let store = Self::default();
        store.set_fail_writes(true);
        store
    }

    /// Toggle write failure at runtime
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored notifications
    pub async fn len(&self) -> usize {
        self.notifications.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.notifications.read().await.is_empty()
    }

    /// Snapshot of every stored notification, in no particular order
    pub async fn all(&self) -> Vec<Notification> {
        self.notifications.read().await.values().cloned().collect()
    }

    fn check_writable(&self) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::database(
                "In-memory store",
                "configured to fail writes",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn create(&self, notification: &Notification) -> Result<(), DomainError> {
        self.check_writable()?;
        let mut notifications = self.notifications.write().await;
        if notifications.contains_key(notification.id()) {
            return Err(DomainError::database(
                "Failed to insert notification",
                format!("duplicate id {}", notification.id()),
            ));
        }
        notifications.insert(*notification.id(), notification.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &NotificationId) -> Result<Option<Notification>, DomainError> {
        Ok(self.notifications.read().await.get(id).cloned())
    }

    async fn find_by_user(
        &self,
        user_id: &UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Notification>, DomainError> {
        let notifications = self.notifications.read().await;
        let mut owned: Vec<Notification> = notifications
            .values()
            .filter(|n| n.is_addressed_to(user_id))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at().cmp(a.created_at()));

        Ok(owned
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn mark_read(
        &self,
        id: &NotificationId,
        read_at: Timestamp,
    ) -> Result<Timestamp, DomainError> {
        self.check_writable()?;
        let mut notifications = self.notifications.write().await;
        let notification = notifications
            .get_mut(id)
            .ok_or_else(|| DomainError::notification_not_found(id))?;
        notification.mark_read(read_at)?;
        Ok(notification.read_at().copied().unwrap_or(read_at))
    }

    async fn delete(&self, id: &NotificationId) -> Result<(), DomainError> {
        self.check_writable()?;
        self.notifications
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DomainError::notification_not_found(id))
    }
}
