//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, caller identity, errors)
//! - `notification` - Notification aggregate and the broker events that produce it

pub mod foundation;
pub mod notification;
