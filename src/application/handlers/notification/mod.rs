//! Notification handlers.

mod service;
mod subscription_created;

pub use service::{
    CreateNotificationCommand, NotificationPage, NotificationService, DEFAULT_PAGE_LIMIT,
    MAX_PAGE_LIMIT,
};
pub use subscription_created::{SubscriptionCreatedHandler, SUBSCRIPTION_TITLE, SUBSCRIPTION_TYPE};
