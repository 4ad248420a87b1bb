//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment could not be read or deserialized.
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// A loaded value that the relay refuses to start with.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    // server
    #[error("Port must be non-zero")]
    InvalidPort,
    #[error("Request timeout must be between 1 and 300 seconds")]
    InvalidTimeout,
    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),
    #[error("Invalid CORS origin: {0:?}")]
    InvalidCorsOrigin(String),

    // database
    #[error("Database URL must start with postgres:// or postgresql://")]
    InvalidDatabaseUrl,
    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,
    #[error("Pool max_connections must be between 1 and 100")]
    PoolSizeOutOfRange,

    // broker
    #[error("Broker URL must start with amqp:// or amqps://")]
    InvalidBrokerUrl,

    // delivery
    #[error("Outbound queue capacity must be between 1 and 10000")]
    InvalidQueueCapacity,
    #[error("Write timeout must be between 1 and 120 seconds")]
    InvalidWriteTimeout,

    // auth
    #[error("Keycloak URL must use HTTPS in production")]
    AuthorityMustBeHttps,
}
