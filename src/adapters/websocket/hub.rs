//! Registry of live connections, at most one per user.
//!
//! The hub is created once at startup and shared via `Arc` with everything
//! that delivers or accepts connections. It has no global instance.
//!
//! # Replacement
//!
//! Registering a second connection for a user replaces the first and shuts
//! the first one down. A superseded connection removes itself through
//! [`ConnectionHub::unregister_if_current`], which cannot evict its
//! replacement.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::domain::foundation::UserId;
use crate::ports::{LiveDelivery, OutboundMessage, SendOutcome};

use super::connection::{ConnectionHandle, ConnectionId};

/// Live user connections.
///
/// # Delivery policy
///
/// Best-effort, at most one in-flight delivery attempt per connection.
/// [`send_to_user`](Self::send_to_user) offers a message once and returns
/// immediately; an offline recipient or a full queue silently loses it.
///
/// # Thread Safety
///
/// Uses `RwLock` since lookups (reads) vastly outnumber registrations
/// (writes). Concurrent sends share the read lock; `try_send` never waits,
/// so the lock is never held across a slow peer.
pub struct ConnectionHub {
    connections: RwLock<HashMap<UserId, ConnectionHandle>>,
    stats: DeliveryCounters,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            stats: DeliveryCounters::default(),
        }
    }

    /// Make `handle` the user's current connection.
    ///
    /// Returns true if it displaced an existing connection, which is
    /// closed before this returns.
    pub async fn register(&self, handle: ConnectionHandle) -> bool {
        let user_id = *handle.user_id();
        let connection_id = handle.id();

        let previous = self.connections.write().await.insert(user_id, handle);
        self.stats.registered.fetch_add(1, Ordering::Relaxed);

        match previous {
            Some(previous) => {
                self.stats.superseded.fetch_add(1, Ordering::Relaxed);
                previous.close();
                tracing::info!(
                    user_id = %user_id,
                    connection_id = %connection_id,
                    superseded = %previous.id(),
                    "Connection replaced; closing superseded connection"
                );
                true
            }
            None => {
                tracing::debug!(
                    user_id = %user_id,
                    connection_id = %connection_id,
                    "Connection registered"
                );
                false
            }
        }
    }

    /// Remove the user's connection, if any. Idempotent.
    ///
    /// Dropping the hub's handle closes that connection's queue, so a live
    /// connection shuts down after this.
    pub async fn unregister(&self, user_id: &UserId) -> bool {
        let removed = self.connections.write().await.remove(user_id);
        match removed {
            Some(handle) => {
                self.stats.unregistered.fetch_add(1, Ordering::Relaxed);
                handle.close();
                true
            }
            None => false,
        }
    }

    /// Remove the user's entry only if it is still `connection_id`.
    pub async fn unregister_if_current(&self, user_id: &UserId, connection_id: ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        let is_current = connections
            .get(user_id)
            .map(|handle| handle.id() == connection_id)
            .unwrap_or(false);

        if is_current {
            connections.remove(user_id);
            self.stats.unregistered.fetch_add(1, Ordering::Relaxed);
        }
        is_current
    }

    /// Offer `message` to the user's current connection.
    pub async fn send_to_user(&self, user_id: &UserId, message: OutboundMessage) -> SendOutcome {
        let outcome = {
            let connections = self.connections.read().await;
            match connections.get(user_id) {
                Some(handle) => handle.enqueue(message),
                None => SendOutcome::Offline,
            }
        };

        let counter = match outcome {
            SendOutcome::Queued => &self.stats.queued,
            SendOutcome::QueueFull => &self.stats.dropped_full,
            SendOutcome::Closed => &self.stats.dropped_closed,
            SendOutcome::Offline => {
                tracing::debug!(user_id = %user_id, "Recipient offline, message dropped");
                &self.stats.offline
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);

        outcome
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_connected(&self, user_id: &UserId) -> bool {
        self.connections.read().await.contains_key(user_id)
    }

    pub fn stats(&self) -> DeliveryStats {
        self.stats.snapshot()
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LiveDelivery for ConnectionHub {
    async fn send_to_user(&self, user_id: &UserId, message: OutboundMessage) -> SendOutcome {
        ConnectionHub::send_to_user(self, user_id, message).await
    }
}

#[derive(Debug, Default)]
struct DeliveryCounters {
    registered: AtomicU64,
    unregistered: AtomicU64,
    superseded: AtomicU64,
    queued: AtomicU64,
    dropped_full: AtomicU64,
    dropped_closed: AtomicU64,
    offline: AtomicU64,
}

impl DeliveryCounters {
    fn snapshot(&self) -> DeliveryStats {
        DeliveryStats {
            registered: self.registered.load(Ordering::Relaxed),
            unregistered: self.unregistered.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            dropped_full: self.dropped_full.load(Ordering::Relaxed),
            dropped_closed: self.dropped_closed.load(Ordering::Relaxed),
            offline: self.offline.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the hub's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryStats {
    pub registered: u64,
    pub unregistered: u64,
    pub superseded: u64,
    pub queued: u64,
    pub dropped_full: u64,
    pub dropped_closed: u64,
    pub offline: u64,
}
