//! Notification domain module.
//!
//! A notification is a short message addressed to one user. It is created
//! unread, and may be marked read exactly once.
//!
//! # Events
//!
//! Inbound broker events that produce notifications live in [`events`]:
//!
//! - `subscription.created` - someone started following the recipient

mod aggregate;
mod errors;
pub mod events;

pub use aggregate::{Notification, DEFAULT_NOTIFICATION_TYPE};
pub use errors::NotificationError;
pub use events::{SubscriptionCreated, SUBSCRIPTION_CREATED};
