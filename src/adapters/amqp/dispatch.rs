//! Routing of broker deliveries to event handlers.
//!
//! The [`HandlerTable`] is built once before consumption starts and never
//! changes afterwards. The [`Dispatcher`] drives any stream of [`Frame`]s,
//! so the routing rules are exercised without a broker.

use std::collections::HashMap;
use std::fmt;

use futures::{Stream, StreamExt};
use tokio::sync::watch;

use crate::ports::EventHandler;

use super::error::BrokerError;

/// One broker delivery, reduced to what routing needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub routing_key: String,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn new(routing_key: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            routing_key: routing_key.into(),
            body: body.into(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Handler table
// ════════════════════════════════════════════════════════════════════════════

/// Immutable routing key → handler map.
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<String, EventHandler>,
}

impl HandlerTable {
    pub fn builder() -> HandlerTableBuilder {
        HandlerTableBuilder::default()
    }

    pub fn get(&self, routing_key: &str) -> Option<&EventHandler> {
        self.handlers.get(routing_key)
    }

    pub fn routing_keys(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable")
            .field("routing_keys", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Default)]
pub struct HandlerTableBuilder {
    handlers: HashMap<String, EventHandler>,
}

impl HandlerTableBuilder {
    /// Bind `handler` to `routing_key`. A later binding for the same key wins.
    pub fn on(mut self, routing_key: impl Into<String>, handler: EventHandler) -> Self {
        self.handlers.insert(routing_key.into(), handler);
        self
    }

    pub fn build(self) -> HandlerTable {
        HandlerTable {
            handlers: self.handlers,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Dispatcher
// ════════════════════════════════════════════════════════════════════════════

/// Result of routing a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Handled,
    Unrouted,
    EmptyBody,
    Failed,
}

/// Routes frames to their handlers one at a time.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    table: HandlerTable,
}

impl Dispatcher {
    pub fn new(table: HandlerTable) -> Self {
        Self { table }
    }

    /// Route one frame. Handler failures are logged, never returned.
    pub async fn dispatch(&self, frame: Frame) -> Dispatched {
        let Some(handler) = self.table.get(&frame.routing_key) else {
            tracing::warn!(routing_key = %frame.routing_key, "No handler for routing key, dropping");
            return Dispatched::Unrouted;
        };

        if frame.body.is_empty() {
            tracing::warn!(routing_key = %frame.routing_key, "Empty event body, skipping");
            return Dispatched::EmptyBody;
        }

        match handler(frame.body).await {
            Ok(()) => {
                tracing::debug!(routing_key = %frame.routing_key, "Event handled");
                Dispatched::Handled
            }
            Err(e) => {
                tracing::warn!(routing_key = %frame.routing_key, error = %e, "Event handler failed");
                Dispatched::Failed
            }
        }
    }

    /// Consume `frames` until shutdown is signalled or the stream ends.
    ///
    /// # Returns
    ///
    /// `Ok(())` on shutdown, [`BrokerError::StreamClosed`] if the stream
    /// ends first.
    pub async fn run<S, E>(
        &self,
        frames: S,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), BrokerError>
    where
        S: Stream<Item = Result<Frame, E>>,
        E: fmt::Display,
    {
        tokio::pin!(frames);

        loop {
            if *shutdown.borrow_and_update() {
                tracing::info!("Dispatcher stopping on shutdown signal");
                return Ok(());
            }

            let next = tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        tracing::info!("Shutdown sender dropped, dispatcher stopping");
                        return Ok(());
                    }
                    continue;
                }

                next = frames.next() => next,
            };

            match next {
                Some(Ok(frame)) => {
                    self.dispatch(frame).await;
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Delivery stream error");
                }
                None => {
                    tracing::error!("Delivery stream ended");
                    return Err(BrokerError::StreamClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::HandlerError;
    use futures::FutureExt;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    fn counting_handler(calls: Arc<AtomicUsize>) -> EventHandler {
        Arc::new(move |_body: Vec<u8>| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<(), HandlerError>(())
            }
            .boxed()
        })
    }

    fn recording_handler(seen: Arc<Mutex<Vec<Vec<u8>>>>) -> EventHandler {
        Arc::new(move |body: Vec<u8>| {
            let seen = seen.clone();
            async move {
                seen.lock().await.push(body);
                Ok::<(), HandlerError>(())
            }
            .boxed()
        })
    }

    fn failing_handler() -> EventHandler {
        Arc::new(|body: Vec<u8>| {
            async move {
                serde_json::from_slice::<serde_json::Value>(&body)?;
                Ok::<(), HandlerError>(())
            }
            .boxed()
        })
    }

    #[test]
    fn builder_registers_handlers() {
        let table = HandlerTable::builder()
            .on("a", counting_handler(Arc::default()))
            .on("b", counting_handler(Arc::default()))
            .build();

        assert_eq!(table.len(), 2);
        assert!(table.get("a").is_some());
        assert!(table.get("c").is_none());
    }

    #[tokio::test]
    async fn dispatch_routes_by_key() {
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new(
            HandlerTable::builder()
                .on("a", counting_handler(a.clone()))
                .on("b", counting_handler(b.clone()))
                .build(),
        );

        assert_eq!(dispatcher.dispatch(Frame::new("a", "{}")).await, Dispatched::Handled);

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unrouted_frame_is_dropped() {
        let dispatcher = Dispatcher::new(HandlerTable::default());

        assert_eq!(
            dispatcher.dispatch(Frame::new("unknown", "{}")).await,
            Dispatched::Unrouted
        );
    }

    #[tokio::test]
    async fn empty_body_is_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher =
            Dispatcher::new(HandlerTable::builder().on("a", counting_handler(calls.clone())).build());

        assert_eq!(
            dispatcher.dispatch(Frame::new("a", Vec::new())).await,
            Dispatched::EmptyBody
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn run_continues_past_unrouted_failing_and_errored_frames() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::new(
            HandlerTable::builder()
                .on("good", recording_handler(seen.clone()))
                .on("bad", failing_handler())
                .build(),
        );
        let frames = futures::stream::iter(vec![
            Ok(Frame::new("unknown", "{}")),
            Ok(Frame::new("bad", "not json")),
            Err("connection hiccup"),
            Ok(Frame::new("good", "1")),
            Ok(Frame::new("good", "2")),
        ]);
        let (_tx, rx) = watch::channel(false);

        let result = dispatcher.run(frames, rx).await;

        assert!(matches!(result, Err(BrokerError::StreamClosed)));
        assert_eq!(*seen.lock().await, vec![b"1".to_vec(), b"2".to_vec()]);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_while_waiting() {
        let dispatcher = Dispatcher::new(HandlerTable::default());
        let frames = futures::stream::pending::<Result<Frame, String>>();
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(async move { dispatcher.run(frames, rx).await });
        tx.send(true).unwrap();

        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn run_returns_immediately_if_already_shut_down() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher =
            Dispatcher::new(HandlerTable::builder().on("a", counting_handler(calls.clone())).build());
        let frames = futures::stream::iter(vec![Ok::<_, String>(Frame::new("a", "{}"))]);
        let (_tx, rx) = watch::channel(true);

        assert!(dispatcher.run(frames, rx).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
