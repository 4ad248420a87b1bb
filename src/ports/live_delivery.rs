//! Live delivery port - push a message to whichever client currently
//! represents a user.
//!
//! Delivery is **best-effort, at most one in-flight delivery attempt per
//! connection**: a message is offered once, without waiting, and silently
//! abandoned when the recipient is offline or its outbound buffer is full.
//! Nothing here is a delivery guarantee; the persisted notification is the
//! durable record.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::foundation::{NotificationId, Timestamp, UserId};
use crate::domain::notification::Notification;

/// A message bound for a live connection.
///
/// Serialized as one JSON text frame. The wire contract is only
/// "valid JSON": structured notifications become objects, ad-hoc pushes
/// become bare JSON strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    Notification(NotificationPayload),
    Text(String),
}

impl OutboundMessage {
    pub fn text(message: impl Into<String>) -> Self {
        OutboundMessage::Text(message.into())
    }
}

impl From<&Notification> for OutboundMessage {
    fn from(notification: &Notification) -> Self {
        OutboundMessage::Notification(NotificationPayload::from(notification))
    }
}

/// Wire shape of a pushed notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationPayload {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub is_read: bool,
    pub created_at: Timestamp,
}

impl From<&Notification> for NotificationPayload {
    fn from(n: &Notification) -> Self {
        Self {
            id: *n.id(),
            user_id: *n.user_id(),
            title: n.title().to_string(),
            message: n.message().to_string(),
            notification_type: n.notification_type().to_string(),
            is_read: n.is_read(),
            created_at: *n.created_at(),
        }
    }
}

/// What happened to a single delivery attempt.
///
/// None of these is an error: the caller has nothing to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendOutcome {
    /// Placed on the recipient's outbound queue.
    Queued,
    /// Recipient's outbound queue was at capacity; message dropped.
    QueueFull,
    /// Recipient's connection is shutting down; message dropped.
    Closed,
    /// No live connection for the recipient; message dropped.
    Offline,
}

impl SendOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, SendOutcome::Queued)
    }
}

/// Pushes messages to live user connections.
#[async_trait]
pub trait LiveDelivery: Send + Sync {
    /// Offer `message` to the user's current connection, if any.
    ///
    /// Never blocks on the recipient and never fails.
    async fn send_to_user(&self, user_id: &UserId, message: OutboundMessage) -> SendOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn text_message_serializes_as_json_string() {
        let json = serde_json::to_string(&OutboundMessage::text("hello")).unwrap();
        assert_eq!(json, "\"hello\"");
    }

    #[test]
    fn notification_message_serializes_as_object() {
        let n = Notification::new(
            NotificationId::new(),
            UserId::new(Uuid::new_v4()).unwrap(),
            "New follower",
            "You have a new follower!",
            Some("subscription".to_string()),
            Timestamp::now(),
        )
        .unwrap();

        let value = serde_json::to_value(OutboundMessage::from(&n)).unwrap();
        assert_eq!(value["title"], "New follower");
        assert_eq!(value["type"], "subscription");
        assert_eq!(value["is_read"], false);
        assert_eq!(value["user_id"], n.user_id().to_string());
    }

    #[test]
    fn live_delivery_is_object_safe() {
        fn _accepts_dyn(_delivery: &dyn LiveDelivery) {}
    }
}
