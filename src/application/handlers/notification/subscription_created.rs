//! SubscriptionCreatedHandler - Turns a new follow into a notification.
//!
//! 1. Decode the `subscription.created` payload
//! 2. Persist a notification for the followee
//! 3. Offer it to the followee's live connection, if any

use std::sync::Arc;

use futures::FutureExt;

use crate::domain::notification::{Notification, SubscriptionCreated};
use crate::ports::{EventHandler, HandlerError, LiveDelivery, OutboundMessage};

use super::service::{CreateNotificationCommand, NotificationService};

pub const SUBSCRIPTION_TITLE: &str = "New follower";
pub const SUBSCRIPTION_TYPE: &str = "subscription";

/// Handler for `subscription.created` events.
pub struct SubscriptionCreatedHandler {
    service: Arc<NotificationService>,
    delivery: Arc<dyn LiveDelivery>,
}

impl SubscriptionCreatedHandler {
    pub fn new(service: Arc<NotificationService>, delivery: Arc<dyn LiveDelivery>) -> Self {
        Self { service, delivery }
    }

    /// Decode, persist and deliver one event.
    ///
    /// Delivery is attempted only after the notification is stored, and its
    /// outcome is not an error.
    pub async fn handle(&self, body: &[u8]) -> Result<Notification, HandlerError> {
        let event: SubscriptionCreated = serde_json::from_slice(body)?;

        let notification = self
            .service
            .create(CreateNotificationCommand {
                user_id: *event.followee_id.as_uuid(),
                title: SUBSCRIPTION_TITLE.to_string(),
                message: event.render_message(),
                notification_type: Some(SUBSCRIPTION_TYPE.to_string()),
            })
            .await
            .map_err(HandlerError::Persist)?;

        let outcome = self
            .delivery
            .send_to_user(notification.user_id(), OutboundMessage::from(&notification))
            .await;

        tracing::debug!(
            notification_id = %notification.id(),
            followee_id = %event.followee_id,
            ?outcome,
            "Subscription notification processed"
        );

        Ok(notification)
    }

    /// Wrap this handler for registration in a handler table.
    pub fn into_event_handler(self) -> EventHandler {
        let handler = Arc::new(self);
        Arc::new(move |body: Vec<u8>| {
            let handler = handler.clone();
            async move { handler.handle(&body).await.map(|_| ()) }.boxed()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryNotificationStore;
    use crate::domain::foundation::UserId;
    use crate::ports::SendOutcome;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    const FOLLOWER: &str = "11111111-1111-1111-1111-111111111111";
    const FOLLOWEE: &str = "22222222-2222-2222-2222-222222222222";

    #[derive(Default)]
    struct RecordingDelivery {
        sent: Mutex<Vec<(UserId, OutboundMessage)>>,
    }

    #[async_trait]
    impl LiveDelivery for RecordingDelivery {
        async fn send_to_user(&self, user_id: &UserId, message: OutboundMessage) -> SendOutcome {
            self.sent.lock().await.push((*user_id, message));
            SendOutcome::Offline
        }
    }

    fn body() -> Vec<u8> {
        format!(
            r#"{{"follower_id":"{FOLLOWER}","followee_id":"{FOLLOWEE}","created_at_unix":1700000000}}"#
        )
        .into_bytes()
    }

    fn handler(
        store: InMemoryNotificationStore,
    ) -> (SubscriptionCreatedHandler, Arc<RecordingDelivery>) {
        let delivery = Arc::new(RecordingDelivery::default());
        let service = Arc::new(NotificationService::new(Arc::new(store)));
        (
            SubscriptionCreatedHandler::new(service, delivery.clone()),
            delivery,
        )
    }

    #[tokio::test]
    async fn persists_notification_for_followee() {
        let store = InMemoryNotificationStore::new();
        let (handler, _) = handler(store.clone());

        let n = handler.handle(&body()).await.unwrap();

        assert_eq!(n.user_id().to_string(), FOLLOWEE);
        assert_eq!(n.title(), SUBSCRIPTION_TITLE);
        assert_eq!(n.notification_type(), SUBSCRIPTION_TYPE);
        assert!(n.message().contains(FOLLOWER));
        assert!(n.message().contains("1700000000"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn delivers_persisted_notification_once() {
        let (handler, delivery) = handler(InMemoryNotificationStore::new());

        let n = handler.handle(&body()).await.unwrap();

        let sent = delivery.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, *n.user_id());
        assert_eq!(sent[0].1, OutboundMessage::from(&n));
    }

    #[tokio::test]
    async fn malformed_payload_is_a_decode_error() {
        let store = InMemoryNotificationStore::new();
        let (handler, delivery) = handler(store.clone());

        let err = handler.handle(b"{\"follower_id\":").await.unwrap_err();

        assert!(matches!(err, HandlerError::Decode(_)));
        assert!(store.is_empty().await);
        assert!(delivery.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn persist_failure_skips_delivery() {
        let (handler, delivery) = handler(InMemoryNotificationStore::failing());

        let err = handler.handle(&body()).await.unwrap_err();

        assert!(matches!(err, HandlerError::Persist(_)));
        assert!(delivery.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn event_handler_wrapper_runs_handler() {
        let store = InMemoryNotificationStore::new();
        let (handler, _) = handler(store.clone());
        let event_handler = handler.into_event_handler();

        event_handler(body()).await.unwrap();

        assert_eq!(store.len().await, 1);
    }
}
