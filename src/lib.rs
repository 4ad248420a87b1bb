//! Notification Relay - Real-time notification delivery
//!
//! Domain events arrive on an AMQP topic exchange, become persisted
//! notifications, and are pushed over WebSocket to whichever client
//! currently represents the recipient.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
