//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, caller identity and the error types every
//! port speaks.

mod auth;
mod errors;
mod ids;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{NotificationId, UserId};
pub use timestamp::Timestamp;
