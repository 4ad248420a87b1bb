//! One live WebSocket bound to one user.
//!
//! A [`Connection`] owns a bounded outbound queue and, once running, two
//! independent tasks:
//!
//! ```text
//!   ConnectionHub::send_to_user ──► enqueue (try_send) ──► [ mpsc queue ]
//!                                                               │
//!                                            outbound task ◄────┘
//!                                              │  serialize, write with deadline
//!                                              ▼
//!                                            socket ◄──── inbound task (liveness only)
//! ```
//!
//! Whichever task stops first runs the teardown exactly once: unregister
//! from the hub (only if still current), then signal the other task. The
//! outbound task owns the sink and closes it on exit, so the transport is
//! closed exactly once.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::domain::foundation::UserId;
use crate::ports::{OutboundMessage, SendOutcome};

use super::hub::ConnectionHub;

/// Per-connection tuning.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Outbound queue capacity; messages beyond it are dropped.
    pub queue_capacity: usize,

    /// Deadline for a single frame write.
    pub write_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            write_timeout: Duration::from_secs(10),
        }
    }
}

/// Unique identifier for one socket, distinct from the user it serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cloneable sending side of a connection, as stored in the hub.
///
/// # Delivery policy
///
/// Best-effort, at most one in-flight delivery attempt per connection:
/// [`enqueue`](Self::enqueue) never waits. A full queue drops the message
/// and a closed connection refuses it. Callers must not treat `Queued` as
/// proof of receipt.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    user_id: UserId,
    outbound: mpsc::Sender<OutboundMessage>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Offer a message to the outbound queue without blocking.
    pub fn enqueue(&self, message: OutboundMessage) -> SendOutcome {
        match self.outbound.try_send(message) {
            Ok(()) => SendOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    user_id = %self.user_id,
                    connection_id = %self.id,
                    "Outbound queue full, dropping message"
                );
                SendOutcome::QueueFull
            }
            Err(mpsc::error::TrySendError::Closed(_)) => SendOutcome::Closed,
        }
    }

    /// Ask both loops to stop. Idempotent.
    pub fn close(&self) {
        self.shutdown.send_replace(true);
    }

    /// True once shutdown was requested or the outbound task has gone.
    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow() || self.outbound.is_closed()
    }
}

/// A connection that has been created but whose loops are not yet running.
pub struct Connection {
    handle: ConnectionHandle,
    outbound_rx: mpsc::Receiver<OutboundMessage>,
    write_timeout: Duration,
}

impl Connection {
    pub fn new(user_id: UserId, settings: &ConnectionSettings) -> Self {
        let (outbound, outbound_rx) = mpsc::channel(settings.queue_capacity.max(1));
        let (shutdown, _) = watch::channel(false);

        Self {
            handle: ConnectionHandle {
                id: ConnectionId::new(),
                user_id,
                outbound,
                shutdown: Arc::new(shutdown),
            },
            outbound_rx,
            write_timeout: settings.write_timeout,
        }
    }

    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    /// Register with the hub, then run until the connection dies.
    pub async fn serve<W, R, E>(self, sink: W, stream: R, hub: Arc<ConnectionHub>)
    where
        W: Sink<Message> + Send + Unpin + 'static,
        W::Error: fmt::Display + Send,
        R: Stream<Item = Result<Message, E>> + Send + Unpin + 'static,
        E: fmt::Display + Send + 'static,
    {
        hub.register(self.handle.clone()).await;
        self.run(sink, stream, hub).await;
    }

    /// Run both loops until the connection dies. Does not register.
    ///
    /// The connection keeps no sender of its own, so once the hub drops its
    /// handle (unregister or replacement) the queue closes and the outbound
    /// loop ends.
    pub async fn run<W, R, E>(self, sink: W, stream: R, hub: Arc<ConnectionHub>)
    where
        W: Sink<Message> + Send + Unpin + 'static,
        W::Error: fmt::Display + Send,
        R: Stream<Item = Result<Message, E>> + Send + Unpin + 'static,
        E: fmt::Display + Send + 'static,
    {
        let Connection {
            handle,
            outbound_rx,
            write_timeout,
        } = self;

        let teardown = Arc::new(Teardown::new(&handle, hub));
        let outbound_shutdown = handle.shutdown.subscribe();
        let inbound_shutdown = handle.shutdown.subscribe();
        drop(handle);

        tracing::debug!(
            user_id = %teardown.user_id,
            connection_id = %teardown.connection_id,
            "Connection started"
        );

        let outbound = tokio::spawn(drain_outbound(
            sink,
            outbound_rx,
            outbound_shutdown,
            write_timeout,
            teardown.clone(),
        ));
        let inbound = tokio::spawn(watch_inbound(stream, inbound_shutdown, teardown.clone()));

        let (outbound_result, inbound_result) = tokio::join!(outbound, inbound);
        for result in [outbound_result, inbound_result] {
            if let Err(e) = result {
                tracing::error!(
                    user_id = %teardown.user_id,
                    connection_id = %teardown.connection_id,
                    "Connection task failed: {}",
                    e
                );
            }
        }

        // A panicked task never reached its own teardown.
        teardown.run("task ended").await;
    }
}

/// Shared end-of-life step, executed once by whichever loop stops first.
struct Teardown {
    done: AtomicBool,
    user_id: UserId,
    connection_id: ConnectionId,
    shutdown: Arc<watch::Sender<bool>>,
    hub: Arc<ConnectionHub>,
}

impl Teardown {
    fn new(handle: &ConnectionHandle, hub: Arc<ConnectionHub>) -> Self {
        Self {
            done: AtomicBool::new(false),
            user_id: handle.user_id,
            connection_id: handle.id,
            shutdown: handle.shutdown.clone(),
            hub,
        }
    }

    /// Returns false if teardown had already run.
    async fn run(&self, reason: &'static str) -> bool {
        if self.done.swap(true, Ordering::AcqRel) {
            return false;
        }

        let removed = self
            .hub
            .unregister_if_current(&self.user_id, self.connection_id)
            .await;
        self.shutdown.send_replace(true);

        tracing::debug!(
            user_id = %self.user_id,
            connection_id = %self.connection_id,
            reason,
            removed,
            "Connection closed"
        );
        true
    }
}

/// Resolves once shutdown is requested or every shutdown sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

async fn drain_outbound<W, M>(
    mut sink: W,
    mut queue: mpsc::Receiver<M>,
    mut shutdown: watch::Receiver<bool>,
    write_timeout: Duration,
    teardown: Arc<Teardown>,
) where
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display,
    M: Serialize,
{
    let reason = loop {
        let message = tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => break "shutdown",
            next = queue.recv() => match next {
                Some(message) => message,
                None => break "queue closed",
            },
        };

        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    user_id = %teardown.user_id,
                    connection_id = %teardown.connection_id,
                    "Dropping unserializable message: {}",
                    e
                );
                continue;
            }
        };

        match tokio::time::timeout(write_timeout, sink.send(Message::Text(text))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(
                    user_id = %teardown.user_id,
                    connection_id = %teardown.connection_id,
                    "Write failed: {}",
                    e
                );
                break "write failed";
            }
            Err(_) => {
                tracing::warn!(
                    user_id = %teardown.user_id,
                    connection_id = %teardown.connection_id,
                    timeout_ms = write_timeout.as_millis() as u64,
                    "Write timed out"
                );
                break "write timed out";
            }
        }
    };

    teardown.run(reason).await;

    // The close frame gets the same deadline as any write.
    if let Ok(Err(e)) = tokio::time::timeout(write_timeout, sink.close()).await {
        tracing::trace!(connection_id = %teardown.connection_id, "Close failed: {}", e);
    }
}

async fn watch_inbound<R, E>(
    mut stream: R,
    mut shutdown: watch::Receiver<bool>,
    teardown: Arc<Teardown>,
) where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    let reason = loop {
        tokio::select! {
            _ = shutdown_requested(&mut shutdown) => break "shutdown",
            frame = stream.next() => match frame {
                Some(Ok(Message::Close(_))) => break "peer closed",
                // No inbound protocol; frames only prove the peer is alive.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(
                        user_id = %teardown.user_id,
                        connection_id = %teardown.connection_id,
                        "Read failed: {}",
                        e
                    );
                    break "read failed";
                }
                None => break "stream ended",
            },
        }
    };

    teardown.run(reason).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc as fmpsc;
    use serde::ser::Error as _;

    fn user() -> UserId {
        UserId::new(Uuid::new_v4()).unwrap()
    }

    fn settings(capacity: usize) -> ConnectionSettings {
        ConnectionSettings {
            queue_capacity: capacity,
            write_timeout: Duration::from_millis(200),
        }
    }

    type Inbound = fmpsc::UnboundedSender<Result<Message, String>>;

    /// Socket halves backed by channels: frames written by the connection
    /// arrive on the returned receiver; frames pushed into `Inbound` are
    /// read by the connection.
    fn transport() -> (
        fmpsc::UnboundedSender<Message>,
        fmpsc::UnboundedReceiver<Message>,
        Inbound,
        fmpsc::UnboundedReceiver<Result<Message, String>>,
    ) {
        let (sink, written) = fmpsc::unbounded();
        let (inbound, stream) = fmpsc::unbounded();
        (sink, written, inbound, stream)
    }

    fn text(frame: Message) -> String {
        match frame {
            Message::Text(text) => text,
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    #[test]
    fn enqueue_beyond_capacity_drops_without_blocking() {
        let conn = Connection::new(user(), &settings(2));
        let handle = conn.handle();

        assert_eq!(handle.enqueue(OutboundMessage::text("a")), SendOutcome::Queued);
        assert_eq!(handle.enqueue(OutboundMessage::text("b")), SendOutcome::Queued);
        assert_eq!(handle.enqueue(OutboundMessage::text("c")), SendOutcome::QueueFull);
    }

    #[test]
    fn enqueue_after_receiver_dropped_reports_closed() {
        let conn = Connection::new(user(), &settings(2));
        let handle = conn.handle();
        drop(conn);

        assert_eq!(handle.enqueue(OutboundMessage::text("a")), SendOutcome::Closed);
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn writes_queued_messages_in_fifo_order() {
        let hub = Arc::new(ConnectionHub::new());
        let conn = Connection::new(user(), &settings(8));
        let handle = conn.handle();
        hub.register(handle.clone()).await;

        for body in ["first", "second", "third"] {
            assert!(handle.enqueue(OutboundMessage::text(body)).is_queued());
        }

        let (sink, mut written, inbound, stream) = transport();
        let task = tokio::spawn(conn.run(sink, stream, hub.clone()));

        assert_eq!(text(written.next().await.unwrap()), "\"first\"");
        assert_eq!(text(written.next().await.unwrap()), "\"second\"");
        assert_eq!(text(written.next().await.unwrap()), "\"third\"");

        drop(inbound);
        task.await.unwrap();
        assert!(!hub.is_connected(handle.user_id()).await);
    }

    #[tokio::test]
    async fn overflow_keeps_order_of_already_queued_messages() {
        let hub = Arc::new(ConnectionHub::new());
        let conn = Connection::new(user(), &settings(2));
        let handle = conn.handle();
        hub.register(handle.clone()).await;

        handle.enqueue(OutboundMessage::text("one"));
        handle.enqueue(OutboundMessage::text("two"));
        assert_eq!(handle.enqueue(OutboundMessage::text("three")), SendOutcome::QueueFull);

        let (sink, mut written, inbound, stream) = transport();
        let task = tokio::spawn(conn.run(sink, stream, hub.clone()));

        assert_eq!(text(written.next().await.unwrap()), "\"one\"");
        assert_eq!(text(written.next().await.unwrap()), "\"two\"");

        drop(inbound);
        task.await.unwrap();
        assert!(written.next().await.is_none());
    }

    #[tokio::test]
    async fn read_failure_unregisters_exactly_once() {
        let hub = Arc::new(ConnectionHub::new());
        let conn = Connection::new(user(), &settings(8));
        let user_id = *conn.handle().user_id();

        let (sink, _written, inbound, stream) = transport();
        inbound.unbounded_send(Err("connection reset".to_string())).unwrap();

        conn.serve(sink, stream, hub.clone()).await;

        let stats = hub.stats();
        assert_eq!(stats.registered, 1);
        assert_eq!(stats.unregistered, 1);
        assert!(!hub.is_connected(&user_id).await);
        assert_eq!(
            hub.send_to_user(&user_id, OutboundMessage::text("late")).await,
            SendOutcome::Offline
        );
    }

    #[tokio::test]
    async fn close_frame_from_peer_ends_connection() {
        let hub = Arc::new(ConnectionHub::new());
        let conn = Connection::new(user(), &settings(8));
        let user_id = *conn.handle().user_id();

        let (sink, _written, inbound, stream) = transport();
        inbound.unbounded_send(Ok(Message::Ping(vec![1]))).unwrap();
        inbound.unbounded_send(Ok(Message::Close(None))).unwrap();

        conn.serve(sink, stream, hub.clone()).await;

        assert!(!hub.is_connected(&user_id).await);
    }

    #[tokio::test]
    async fn write_failure_ends_both_loops() {
        let hub = Arc::new(ConnectionHub::new());
        let conn = Connection::new(user(), &settings(8));
        let handle = conn.handle();
        hub.register(handle.clone()).await;

        let (sink, written, _inbound, stream) = transport();
        drop(written);
        handle.enqueue(OutboundMessage::text("undeliverable"));

        // Inbound stays open: only the failed write can end this.
        conn.run(sink, stream, hub.clone()).await;

        assert!(!hub.is_connected(handle.user_id()).await);
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn write_timeout_ends_connection() {
        let hub = Arc::new(ConnectionHub::new());
        let conn = Connection::new(user(), &settings(8));
        let handle = conn.handle();
        hub.register(handle.clone()).await;

        // Zero-buffer channel never drained: the second send stalls.
        let (sink, _stalled) = fmpsc::channel::<Message>(0);
        let (_inbound, stream) = fmpsc::unbounded::<Result<Message, String>>();
        handle.enqueue(OutboundMessage::text("fits"));
        handle.enqueue(OutboundMessage::text("stalls"));

        tokio::time::timeout(Duration::from_secs(5), conn.run(sink, stream, hub.clone()))
            .await
            .expect("write deadline should end the connection");

        assert!(!hub.is_connected(handle.user_id()).await);
    }

    #[tokio::test]
    async fn superseded_connection_stops_without_evicting_replacement() {
        let hub = Arc::new(ConnectionHub::new());
        let user_id = user();

        let first = Connection::new(user_id, &settings(8));
        let (sink, _written, _inbound, stream) = transport();
        let first_task = tokio::spawn(first.serve(sink, stream, hub.clone()));
        tokio::task::yield_now().await;
        while !hub.is_connected(&user_id).await {
            tokio::task::yield_now().await;
        }

        let second = Connection::new(user_id, &settings(8));
        let second_handle = second.handle();
        hub.register(second_handle.clone()).await;

        tokio::time::timeout(Duration::from_secs(5), first_task)
            .await
            .expect("superseded connection should stop")
            .unwrap();

        assert!(hub.is_connected(&user_id).await);
        assert_eq!(
            hub.send_to_user(&user_id, OutboundMessage::text("hi")).await,
            SendOutcome::Queued
        );
        drop(second);
    }

    #[tokio::test]
    async fn teardown_runs_once() {
        let hub = Arc::new(ConnectionHub::new());
        let conn = Connection::new(user(), &settings(1));
        let handle = conn.handle();
        hub.register(handle.clone()).await;

        let teardown = Teardown::new(&handle, hub.clone());
        assert!(teardown.run("first").await);
        assert!(!teardown.run("second").await);
        assert_eq!(hub.stats().unregistered, 1);
    }

    /// Serializes unless it is `Bad`.
    enum Item {
        Good(&'static str),
        Bad,
    }

    impl Serialize for Item {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                Item::Good(s) => serializer.serialize_str(s),
                Item::Bad => Err(S::Error::custom("unserializable")),
            }
        }
    }

    #[tokio::test]
    async fn serialization_failure_skips_only_that_message() {
        let hub = Arc::new(ConnectionHub::new());
        let conn = Connection::new(user(), &settings(1));
        let teardown = Arc::new(Teardown::new(&conn.handle(), hub));

        let (tx, rx) = mpsc::channel(4);
        tx.send(Item::Good("a")).await.unwrap();
        tx.send(Item::Bad).await.unwrap();
        tx.send(Item::Good("b")).await.unwrap();
        drop(tx);

        let (sink, mut written) = fmpsc::unbounded();
        let (_keep, shutdown) = watch::channel(false);
        drain_outbound(sink, rx, shutdown, Duration::from_secs(1), teardown).await;

        assert_eq!(text(written.next().await.unwrap()), "\"a\"");
        assert_eq!(text(written.next().await.unwrap()), "\"b\"");
        assert!(written.next().await.is_none());
    }
}
