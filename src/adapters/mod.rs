//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `amqp` - Broker subscription and routing-key dispatch (lapin)
//! - `auth` - Session validation (Keycloak JWKS, mock)
//! - `http` - REST surface, auth middleware, router composition (axum)
//! - `postgres` - Notification persistence (sqlx)
//! - `storage` - In-memory notification store
//! - `websocket` - Connection hub and per-socket delivery loops

pub mod amqp;
pub mod auth;
pub mod http;
pub mod postgres;
pub mod storage;
pub mod websocket;

pub use amqp::{AmqpConsumer, BrokerError, Dispatcher, HandlerTable};
pub use websocket::{Connection, ConnectionHandle, ConnectionHub, ConnectionSettings};
