//! Authentication configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;
use crate::adapters::auth::KeycloakConfig;

/// Authentication configuration (Keycloak realm)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Keycloak base URL, without the `/realms/..` suffix
    pub keycloak_url: String,

    pub realm: String,

    /// Expected audience for tokens; unchecked when absent
    #[serde(default)]
    pub audience: Option<String>,

    /// JWKS cache TTL in seconds
    #[serde(default = "default_jwks_cache_ttl")]
    pub jwks_cache_ttl_secs: u64,
}

impl AuthConfig {
    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_secs)
    }

    /// Adapter configuration for the session validator
    pub fn keycloak(&self) -> KeycloakConfig {
        let config = KeycloakConfig::new(&self.keycloak_url, &self.realm)
            .with_cache_duration(self.jwks_cache_ttl());
        match &self.audience {
            Some(audience) if !audience.is_empty() => config.with_audience(audience),
            _ => config,
        }
    }

    /// Validate authentication configuration
    ///
    /// In production, requires HTTPS for the Keycloak URL.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.keycloak_url.is_empty() {
            return Err(ValidationError::MissingRequired("KEYCLOAK_URL"));
        }
        if self.realm.is_empty() {
            return Err(ValidationError::MissingRequired("KEYCLOAK_REALM"));
        }

        if *environment == Environment::Production && !self.keycloak_url.starts_with("https://") {
            return Err(ValidationError::AuthorityMustBeHttps);
        }

        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            keycloak_url: String::new(),
            realm: String::new(),
            audience: None,
            jwks_cache_ttl_secs: default_jwks_cache_ttl(),
        }
    }
}

fn default_jwks_cache_ttl() -> u64 {
    3600
}
