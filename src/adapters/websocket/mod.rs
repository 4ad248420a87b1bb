//! WebSocket adapters for live notification delivery.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │            Event handlers / HTTP push (via LiveDelivery)            │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ send_to_user
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         ConnectionHub                               │
//! │   user-a → conn-1      user-b → conn-7      user-c → conn-9         │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ bounded queue per connection
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Connection                                 │
//! │   outbound task: queue → socket    inbound task: close detection    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`hub`] - One current connection per user
//! - [`connection`] - Per-socket queue and read/write loops
//! - [`handler`] - Axum WebSocket upgrade handler

pub mod connection;
pub mod handler;
pub mod hub;

pub use connection::{Connection, ConnectionHandle, ConnectionId, ConnectionSettings};
pub use handler::{websocket_router, ws_handler, WebSocketState};
pub use hub::{ConnectionHub, DeliveryStats};
