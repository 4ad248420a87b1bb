//! Storage Adapters
//!
//! In-process implementations of storage ports.
//!
//! - **InMemoryNotificationStore** - Stores notifications in memory (testing/development)

mod in_memory_notification_store;

pub use in_memory_notification_store::InMemoryNotificationStore;
