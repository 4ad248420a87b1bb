//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the application and the outside world. Adapters implement these ports.
//!
//! - `EventHandler` - Side effects of one broker event type
//! - `NotificationStore` - Notification persistence
//! - `LiveDelivery` - Best-effort push to a user's live connection
//! - `SessionValidator` - Access token validation

mod event_handler;
mod live_delivery;
mod notification_store;
mod session_validator;

pub use event_handler::{EventHandler, HandlerError};
pub use live_delivery::{LiveDelivery, NotificationPayload, OutboundMessage, SendOutcome};
pub use notification_store::NotificationStore;
pub use session_validator::SessionValidator;
