//! AMQP consumer built on `lapin`.
//!
//! ```text
//! exchange (topic, durable) ──routing_key──► queue (durable) ──► basic_consume ──► Dispatcher
//! ```

use futures::StreamExt;
use lapin::{
    options::{
        BasicConsumeOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    Channel, Connection, ConnectionProperties, ExchangeKind,
};
use tokio::sync::watch;

use crate::config::BrokerConfig;

use super::dispatch::{Dispatcher, Frame, HandlerTable};
use super::error::BrokerError;

const REPLY_SUCCESS: u16 = 200;

/// A connected, fully declared broker subscription.
///
/// Only constructed by [`connect`](Self::connect), so a half-configured
/// consumer cannot exist.
pub struct AmqpConsumer {
    connection: Connection,
    channel: Channel,
    queue: String,
    consumer_tag: String,
}

impl AmqpConsumer {
    /// Dial the broker and declare the topology.
    ///
    /// Steps run in order: connect, open channel, declare exchange, declare
    /// queue, bind. On failure everything opened so far is closed.
    pub async fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let connection = Connection::connect(&config.url, ConnectionProperties::default())
            .await
            .map_err(BrokerError::Connect)?;

        let channel = match connection.create_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                close_connection(&connection).await;
                return Err(BrokerError::Channel(e));
            }
        };

        if let Err(e) = declare_topology(&channel, config).await {
            close_channel(&channel).await;
            close_connection(&connection).await;
            return Err(e);
        }

        tracing::info!(
            exchange = %config.exchange,
            queue = %config.queue,
            routing_key = %config.routing_key,
            "Broker topology declared"
        );

        Ok(Self {
            connection,
            channel,
            queue: config.queue.clone(),
            consumer_tag: config.consumer_tag.clone(),
        })
    }

    /// Consume deliveries and route them through `handlers` until `shutdown`
    /// is signalled.
    ///
    /// # Acknowledgement
    ///
    /// Deliveries are auto-acknowledged on receipt, before their handler
    /// runs. Delivery is therefore **at most once**: an event whose handler
    /// fails, or that is in flight when the process dies, is lost.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::Consume`] if the subscription cannot be started
    /// - [`BrokerError::StreamClosed`] if the broker ends the subscription
    pub async fn start(
        &self,
        handlers: HandlerTable,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), BrokerError> {
        let deliveries = self
            .channel
            .basic_consume(
                &self.queue,
                &self.consumer_tag,
                BasicConsumeOptions {
                    no_ack: true,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|cause| BrokerError::Consume {
                queue: self.queue.clone(),
                cause,
            })?;

        tracing::info!(
            queue = %self.queue,
            consumer_tag = %self.consumer_tag,
            handlers = handlers.len(),
            "Consuming events"
        );

        let frames = deliveries.map(|delivery| {
            delivery.map(|delivery| Frame {
                routing_key: delivery.routing_key.as_str().to_string(),
                body: delivery.data,
            })
        });

        Dispatcher::new(handlers).run(frames, shutdown).await
    }

    /// Close the channel, then the connection. Errors are logged and ignored.
    pub async fn close(&self) {
        close_channel(&self.channel).await;
        close_connection(&self.connection).await;
        tracing::info!("Broker connection closed");
    }
}

async fn declare_topology(channel: &Channel, config: &BrokerConfig) -> Result<(), BrokerError> {
    channel
        .exchange_declare(
            &config.exchange,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..ExchangeDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|cause| BrokerError::DeclareExchange {
            exchange: config.exchange.clone(),
            cause,
        })?;

    channel
        .queue_declare(
            &config.queue,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|cause| BrokerError::DeclareQueue {
            queue: config.queue.clone(),
            cause,
        })?;

    channel
        .queue_bind(
            &config.queue,
            &config.exchange,
            &config.routing_key,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|cause| BrokerError::Bind {
            queue: config.queue.clone(),
            exchange: config.exchange.clone(),
            routing_key: config.routing_key.clone(),
            cause,
        })?;

    Ok(())
}

async fn close_channel(channel: &Channel) {
    if let Err(e) = channel.close(REPLY_SUCCESS, "closing").await {
        tracing::warn!(error = %e, "Failed to close broker channel");
    }
}

async fn close_connection(connection: &Connection) {
    if let Err(e) = connection.close(REPLY_SUCCESS, "closing").await {
        tracing::warn!(error = %e, "Failed to close broker connection");
    }
}
