//! NotificationService - Commands and queries over stored notifications.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::foundation::{DomainError, NotificationId, Timestamp, UserId};
use crate::domain::notification::{Notification, NotificationError};
use crate::ports::NotificationStore;

/// Page size used when the caller gives none.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Command to create a notification.
#[derive(Debug, Clone)]
pub struct CreateNotificationCommand {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub notification_type: Option<String>,
}

/// One page of a user's notifications, newest first.
#[derive(Debug, Clone)]
pub struct NotificationPage {
    pub items: Vec<Notification>,
    pub limit: u32,
    pub offset: u32,
}

/// Use cases shared by the HTTP surface and the event handlers.
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// Validate, stamp and persist a new notification.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for a nil user, blank title or blank message
    /// - `Infrastructure` if the store rejects the write
    pub async fn create(
        &self,
        cmd: CreateNotificationCommand,
    ) -> Result<Notification, NotificationError> {
        let user_id = UserId::new(cmd.user_id).map_err(DomainError::from)?;

        let notification = Notification::new(
            NotificationId::new(),
            user_id,
            cmd.title,
            cmd.message,
            cmd.notification_type,
            Timestamp::now(),
        )?;

        self.store.create(&notification).await?;

        tracing::debug!(
            notification_id = %notification.id(),
            user_id = %notification.user_id(),
            notification_type = %notification.notification_type(),
            "Notification created"
        );

        Ok(notification)
    }

    pub async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<NotificationPage, NotificationError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        let offset = offset.unwrap_or(0);

        let items = self.store.find_by_user(user_id, limit, offset).await?;

        Ok(NotificationPage {
            items,
            limit,
            offset,
        })
    }

    /// # Errors
    ///
    /// - `NotFound` if no such notification exists
    /// - `Forbidden` if it belongs to someone other than `requester`
    pub async fn get(
        &self,
        id: &NotificationId,
        requester: &UserId,
    ) -> Result<Notification, NotificationError> {
        self.load_owned(id, requester).await
    }

    /// Mark a notification read and return when it was read.
    ///
    /// Reading an already-read notification writes nothing and returns the
    /// original `read_at`. When a concurrent request wins the write, its
    /// stored `read_at` is returned.
    pub async fn mark_read(
        &self,
        id: &NotificationId,
        requester: &UserId,
    ) -> Result<Timestamp, NotificationError> {
        let mut notification = self.load_owned(id, requester).await?;

        if notification.mark_read(Timestamp::now())? {
            let read_at = self
                .store
                .mark_read(id, read_at_of(&notification)?)
                .await?;
            tracing::debug!(notification_id = %id, "Notification marked read");
            return Ok(read_at);
        }

        read_at_of(&notification)
    }

    pub async fn delete(
        &self,
        id: &NotificationId,
        requester: &UserId,
    ) -> Result<(), NotificationError> {
        self.load_owned(id, requester).await?;
        self.store.delete(id).await?;
        tracing::debug!(notification_id = %id, "Notification deleted");
        Ok(())
    }

    async fn load_owned(
        &self,
        id: &NotificationId,
        requester: &UserId,
    ) -> Result<Notification, NotificationError> {
        let notification = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| NotificationError::not_found(*id))?;

        if !notification.is_addressed_to(requester) {
            return Err(NotificationError::forbidden());
        }

        Ok(notification)
    }
}

fn read_at_of(notification: &Notification) -> Result<Timestamp, NotificationError> {
    notification
        .read_at()
        .copied()
        .ok_or_else(|| NotificationError::infrastructure("read notification has no read_at"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryNotificationStore;

    fn service() -> (NotificationService, InMemoryNotificationStore) {
        let store = InMemoryNotificationStore::new();
        (NotificationService::new(Arc::new(store.clone())), store)
    }

    fn create_cmd(user_id: Uuid) -> CreateNotificationCommand {
        CreateNotificationCommand {
            user_id,
            title: "Hello".to_string(),
            message: "World".to_string(),
            notification_type: None,
        }
    }

    fn user() -> UserId {
        UserId::new(Uuid::new_v4()).unwrap()
    }

    #[tokio::test]
    async fn create_persists_with_default_type() {
        let (service, store) = service();
        let owner = user();

        let n = service.create(create_cmd(*owner.as_uuid())).await.unwrap();

        assert_eq!(n.notification_type(), "system");
        assert!(!n.is_read());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn create_rejects_nil_user() {
        let (service, store) = service();

        let err = service.create(create_cmd(Uuid::nil())).await.unwrap_err();

        assert!(matches!(
            err,
            NotificationError::ValidationFailed { ref field, .. } if field == "user_id"
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn create_rejects_blank_title() {
        let (service, _) = service();
        let mut cmd = create_cmd(Uuid::new_v4());
        cmd.title = "  ".to_string();

        let err = service.create(cmd).await.unwrap_err();

        assert!(matches!(
            err,
            NotificationError::ValidationFailed { ref field, .. } if field == "title"
        ));
    }

    #[tokio::test]
    async fn create_surfaces_store_failure() {
        let store = InMemoryNotificationStore::failing();
        let service = NotificationService::new(Arc::new(store));

        let err = service.create(create_cmd(Uuid::new_v4())).await.unwrap_err();

        assert!(matches!(err, NotificationError::Infrastructure(_)));
    }

    #[tokio::test]
    async fn list_defaults_and_clamps_limit() {
        let (service, _) = service();
        let owner = user();

        let page = service.list_for_user(&owner, None, None).await.unwrap();
        assert_eq!((page.limit, page.offset), (DEFAULT_PAGE_LIMIT, 0));

        let page = service.list_for_user(&owner, Some(0), None).await.unwrap();
        assert_eq!(page.limit, 1);

        let page = service.list_for_user(&owner, Some(1000), Some(5)).await.unwrap();
        assert_eq!((page.limit, page.offset), (MAX_PAGE_LIMIT, 5));
    }

    #[tokio::test]
    async fn list_only_returns_own_notifications() {
        let (service, _) = service();
        let owner = user();
        let other = user();
        service.create(create_cmd(*owner.as_uuid())).await.unwrap();
        service.create(create_cmd(*other.as_uuid())).await.unwrap();

        let page = service.list_for_user(&owner, None, None).await.unwrap();

        assert_eq!(page.items.len(), 1);
        assert!(page.items[0].is_addressed_to(&owner));
    }

    #[tokio::test]
    async fn get_checks_ownership() {
        let (service, _) = service();
        let owner = user();
        let n = service.create(create_cmd(*owner.as_uuid())).await.unwrap();

        assert!(service.get(n.id(), &owner).await.is_ok());
        assert_eq!(
            service.get(n.id(), &user()).await.unwrap_err(),
            NotificationError::Forbidden
        );

        let missing = NotificationId::new();
        assert_eq!(
            service.get(&missing, &owner).await.unwrap_err(),
            NotificationError::NotFound(missing)
        );
    }

    #[tokio::test]
    async fn mark_read_is_idempotent() {
        let (service, store) = service();
        let owner = user();
        let n = service.create(create_cmd(*owner.as_uuid())).await.unwrap();

        let first = service.mark_read(n.id(), &owner).await.unwrap();
        let second = service.mark_read(n.id(), &owner).await.unwrap();

        assert_eq!(first, second);
        let stored = store.all().await;
        assert!(stored[0].is_read());
        assert_eq!(stored[0].read_at(), Some(&first));
    }

    /// Serves every notification as still unread, as a request that loaded
    /// it just before another request marked it read would see it.
    struct StaleReads(InMemoryNotificationStore);

    #[async_trait::async_trait]
    impl NotificationStore for StaleReads {
        async fn create(&self, n: &Notification) -> Result<(), DomainError> {
            self.0.create(n).await
        }

        async fn find_by_id(
            &self,
            id: &NotificationId,
        ) -> Result<Option<Notification>, DomainError> {
            Ok(self.0.find_by_id(id).await?.map(|n| {
                Notification::reconstitute(
                    *n.id(),
                    *n.user_id(),
                    n.title().to_string(),
                    n.message().to_string(),
                    n.notification_type().to_string(),
                    false,
                    *n.created_at(),
                    None,
                )
            }))
        }

        async fn find_by_user(
            &self,
            user_id: &UserId,
            limit: u32,
            offset: u32,
        ) -> Result<Vec<Notification>, DomainError> {
            self.0.find_by_user(user_id, limit, offset).await
        }

        async fn mark_read(
            &self,
            id: &NotificationId,
            read_at: Timestamp,
        ) -> Result<Timestamp, DomainError> {
            self.0.mark_read(id, read_at).await
        }

        async fn delete(&self, id: &NotificationId) -> Result<(), DomainError> {
            self.0.delete(id).await
        }
    }

    #[tokio::test]
    async fn mark_read_returns_read_at_stored_by_earlier_request() {
        let inner = InMemoryNotificationStore::new();
        let service = NotificationService::new(Arc::new(StaleReads(inner.clone())));
        let owner = user();
        let n = service.create(create_cmd(*owner.as_uuid())).await.unwrap();
        let earlier = n.created_at().plus_secs(1);
        inner.mark_read(n.id(), earlier).await.unwrap();

        let read_at = service.mark_read(n.id(), &owner).await.unwrap();

        assert_eq!(read_at, earlier);
        assert_eq!(inner.all().await[0].read_at(), Some(&earlier));
    }

    #[tokio::test]
    async fn mark_read_of_foreign_notification_is_forbidden() {
        let (service, store) = service();
        let n = service.create(create_cmd(Uuid::new_v4())).await.unwrap();

        let err = service.mark_read(n.id(), &user()).await.unwrap_err();

        assert_eq!(err, NotificationError::Forbidden);
        assert!(!store.all().await[0].is_read());
    }

    #[tokio::test]
    async fn delete_removes_owned_notification() {
        let (service, store) = service();
        let owner = user();
        let n = service.create(create_cmd(*owner.as_uuid())).await.unwrap();

        assert_eq!(
            service.delete(n.id(), &user()).await.unwrap_err(),
            NotificationError::Forbidden
        );
        service.delete(n.id(), &owner).await.unwrap();

        assert!(store.is_empty().await);
        assert!(matches!(
            service.delete(n.id(), &owner).await,
            Err(NotificationError::NotFound(_))
        ));
    }
}
