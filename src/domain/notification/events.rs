//! Inbound broker events that produce notifications.
//!
//! The routing key of each broker frame names the event type; the body is
//! the JSON-encoded payload below.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::UserId;

// ════════════════════════════════════════════════════════════════════════════
// subscription.created
// ════════════════════════════════════════════════════════════════════════════

/// Routing key for [`SubscriptionCreated`].
pub const SUBSCRIPTION_CREATED: &str = "subscription.created";

/// Published by the social graph when `follower_id` starts following `followee_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionCreated {
    pub follower_id: UserId,

    /// Recipient of the resulting notification.
    pub followee_id: UserId,

    /// When the subscription was made, Unix seconds.
    pub created_at_unix: i64,
}

impl SubscriptionCreated {
    /// Human-readable text of the notification this event produces.
    pub fn render_message(&self) -> String {
        format!(
            "You have a new follower! {}, {}",
            self.follower_id, self.created_at_unix
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wire_payload() {
        let body = r#"{"follower_id":"11111111-1111-1111-1111-111111111111","followee_id":"22222222-2222-2222-2222-222222222222","created_at_unix":1700000000}"#;
        let event: SubscriptionCreated = serde_json::from_str(body).unwrap();

        assert_eq!(
            event.followee_id.to_string(),
            "22222222-2222-2222-2222-222222222222"
        );
        assert_eq!(event.created_at_unix, 1_700_000_000);
    }

    #[test]
    fn rendered_message_names_follower_and_time() {
        let event = SubscriptionCreated {
            follower_id: "11111111-1111-1111-1111-111111111111".parse().unwrap(),
            followee_id: "22222222-2222-2222-2222-222222222222".parse().unwrap(),
            created_at_unix: 1_700_000_000,
        };
        assert_eq!(
            event.render_message(),
            "You have a new follower! 11111111-1111-1111-1111-111111111111, 1700000000"
        );
    }

    #[test]
    fn rejects_missing_followee() {
        let body = r#"{"follower_id":"11111111-1111-1111-1111-111111111111","created_at_unix":1}"#;
        assert!(serde_json::from_str::<SubscriptionCreated>(body).is_err());
    }
}
