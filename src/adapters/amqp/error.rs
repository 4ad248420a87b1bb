//! Broker error types.

use thiserror::Error;

/// Setup or subscription failure on the broker side.
///
/// Raised by [`AmqpConsumer::connect`](super::AmqpConsumer::connect) and
/// [`AmqpConsumer::start`](super::AmqpConsumer::start); both are fatal at
/// startup and never retried. The lapin cause is part of the message and is
/// not chained as a source.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("failed to connect to broker: {0}")]
    Connect(lapin::Error),

    #[error("failed to open channel: {0}")]
    Channel(lapin::Error),

    #[error("failed to declare exchange '{exchange}': {cause}")]
    DeclareExchange { exchange: String, cause: lapin::Error },

    #[error("failed to declare queue '{queue}': {cause}")]
    DeclareQueue { queue: String, cause: lapin::Error },

    #[error("failed to bind queue '{queue}' to '{exchange}' with key '{routing_key}': {cause}")]
    Bind {
        queue: String,
        exchange: String,
        routing_key: String,
        cause: lapin::Error,
    },

    #[error("failed to start consuming from '{queue}': {cause}")]
    Consume { queue: String, cause: lapin::Error },

    #[error("delivery stream closed by broker")]
    StreamClosed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn stream_closed_display() {
        assert_eq!(
            BrokerError::StreamClosed.to_string(),
            "delivery stream closed by broker"
        );
    }

    #[test]
    fn cause_is_printed_once() {
        let cause = lapin::Error::ChannelsLimitReached;
        let err = BrokerError::DeclareQueue {
            queue: "notif-q".to_string(),
            cause: cause.clone(),
        };

        assert_eq!(
            err.to_string(),
            format!("failed to declare queue 'notif-q': {}", cause)
        );
        assert!(err.source().is_none());
        assert!(BrokerError::Connect(cause).source().is_none());
    }
}
