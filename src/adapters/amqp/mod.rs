//! AMQP broker adapter.
//!
//! - [`consumer`] - Topology declaration and subscription via `lapin`
//! - [`dispatch`] - Routing key → handler dispatch, broker-independent
//! - [`error`] - Broker errors

pub mod consumer;
pub mod dispatch;
pub mod error;

pub use consumer::AmqpConsumer;
pub use dispatch::{Dispatched, Dispatcher, Frame, HandlerTable, HandlerTableBuilder};
pub use error::BrokerError;
