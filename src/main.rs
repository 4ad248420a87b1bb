//! Notification Relay server.
//!
//! Startup order: config, tracing, database, broker subscription, HTTP.
//! Any setup failure aborts the process before it accepts traffic.

use std::sync::Arc;

use axum::http::HeaderValue;
use tokio::sync::watch;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{fmt, EnvFilter};

use notification_relay::adapters::amqp::{AmqpConsumer, HandlerTable};
use notification_relay::adapters::auth::KeycloakSessionValidator;
use notification_relay::adapters::http::{app_router, AppState};
use notification_relay::adapters::postgres::PostgresNotificationStore;
use notification_relay::adapters::websocket::ConnectionHub;
use notification_relay::application::{NotificationService, SubscriptionCreatedHandler};
use notification_relay::config::{AppConfig, ServerConfig};
use notification_relay::domain::notification::SUBSCRIPTION_CREATED;
use notification_relay::ports::NotificationStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config.server);

    tracing::info!(
        environment = ?config.server.environment,
        "Starting notification relay"
    );

    // Persistence
    tracing::info!(url = %config.database.redacted_url(), "Connecting to database");
    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }
    let store: Arc<dyn NotificationStore> = Arc::new(PostgresNotificationStore::new(pool));
    let service = Arc::new(NotificationService::new(store));

    // Live delivery
    let hub = Arc::new(ConnectionHub::new());

    // Broker subscription
    let handlers = HandlerTable::builder()
        .on(
            SUBSCRIPTION_CREATED,
            SubscriptionCreatedHandler::new(service.clone(), hub.clone()).into_event_handler(),
        )
        .build();
    if handlers.get(&config.broker.routing_key).is_none() {
        tracing::warn!(
            routing_key = %config.broker.routing_key,
            "Bound routing key has no handler; its events will be dropped"
        );
    }

    let consumer = Arc::new(AmqpConsumer::connect(&config.broker).await?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer_task = tokio::spawn({
        let consumer = consumer.clone();
        async move { consumer.start(handlers, shutdown_rx).await }
    });

    // HTTP
    let validator = Arc::new(KeycloakSessionValidator::new(config.auth.keycloak())?);
    let app = app_router(AppState {
        service,
        hub,
        validator,
        connection_settings: config.delivery.connection_settings(),
    })
    .layer(TimeoutLayer::new(config.server.request_timeout()))
    .layer(cors_layer(config.server.cors_origins()?))
    .layer(PropagateRequestIdLayer::x_request_id())
    .layer(TraceLayer::new_for_http())
    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop consuming, then release the broker connection.
    shutdown_tx.send_replace(true);
    match consumer_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Broker consumer ended with error"),
        Err(e) => tracing::error!(error = %e, "Broker consumer task failed"),
    }
    consumer.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// JSON lines in production, human-readable output elsewhere.
///
/// `RUST_LOG` takes precedence over `server.log_level`.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    if server.is_production() {
        fmt().json().with_env_filter(filter).with_target(true).init();
    } else {
        fmt().pretty().with_env_filter(filter).init();
    }
}

/// An empty origin list allows any origin.
fn cors_layer(origins: Vec<HeaderValue>) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
