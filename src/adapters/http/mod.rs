//! HTTP adapters - REST API implementations.
//!
//! - `notification` - CRUD and ad-hoc push under `/api/notifications`
//! - `health` - Liveness and delivery counters
//! - `middleware` - Bearer/query token authentication
//! - `router` - Composition of the above with the WebSocket endpoint

pub mod health;
pub mod middleware;
pub mod notification;
pub mod router;

pub use health::health_routes;
pub use notification::{notification_routes, NotificationHandlers};
pub use router::{app_router, AppState};
