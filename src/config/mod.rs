//! Relay configuration, read once at startup from the environment.
//!
//! Every key is `NOTIFICATION_RELAY__<SECTION>__<FIELD>`; a `.env` file is
//! honoured in development. Sections:
//!
//! | Section    | Required keys                     |
//! |------------|-----------------------------------|
//! | `server`   | none                              |
//! | `database` | `url`                             |
//! | `broker`   | `url`, `exchange`, `queue`        |
//! | `delivery` | none                              |
//! | `auth`     | `keycloak_url`, `realm`           |
//!
//! ```no_run
//! use notification_relay::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! config.validate()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod auth;
mod broker;
mod database;
mod delivery;
mod error;
mod server;

pub use auth::AuthConfig;
pub use broker::BrokerConfig;
pub use database::DatabaseConfig;
pub use delivery::DeliveryConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Environment variable prefix for every setting
pub const ENV_PREFIX: &str = "NOTIFICATION_RELAY";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// Where subscription events come from
    pub broker: BrokerConfig,

    /// Per-connection queue and write deadline
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Keycloak realm that issues client tokens
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Read `.env` (if any) and the process environment.
    ///
    /// Fails when a required key is absent or a value has the wrong type.
    /// Range and format checks are left to [`validate`](Self::validate).
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix(ENV_PREFIX)
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// First failing check, in section order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.broker.validate()?;
        self.delivery.validate()?;
        self.auth.validate(&self.server.environment)?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
