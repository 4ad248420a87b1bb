//! EventHandler port - the capability a broker delivery is routed to.
//!
//! A handler is function-shaped: it receives the raw payload of one event
//! type and performs that event's side effects. Handlers know nothing about
//! the transport that delivered the bytes.

use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::domain::notification::NotificationError;

/// Handles the body of one event type.
///
/// # Example
///
/// ```ignore
/// let handler: EventHandler = Arc::new(|body: Vec<u8>| {
///     async move {
///         let event: SubscriptionCreated = serde_json::from_slice(&body)?;
///         // persist, then deliver...
///         Ok::<(), HandlerError>(())
///     }
///     .boxed()
/// });
/// ```
pub type EventHandler =
    Arc<dyn Fn(Vec<u8>) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// Failure handling one event. The caller logs it and drops the event.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("failed to decode event payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to persist notification: {0}")]
    Persist(#[source] NotificationError),
}
