//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! It depends on ports only; the concrete hub and store are injected.

pub mod handlers;

pub use handlers::{
    CreateNotificationCommand, NotificationPage, NotificationService, SubscriptionCreatedHandler,
};
