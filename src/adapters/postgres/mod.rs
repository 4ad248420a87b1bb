//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresNotificationStore` - Notification persistence

mod notification_store;

pub use notification_store::PostgresNotificationStore;
