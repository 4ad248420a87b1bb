//! Keycloak OIDC adapter for JWT validation.
//!
//! This adapter implements the `SessionValidator` port against a Keycloak
//! realm. It validates JWTs by:
//!
//! 1. Fetching the realm JWKS from `{base}/realms/{realm}/protocol/openid-connect/certs`
//! 2. Validating the JWT signature against the key named by `kid`
//! 3. Validating issuer, expiry and (when configured) audience
//! 4. Mapping the `sub` claim, which must be a UUID, to `UserId`
//!
//! # Example
//!
//! ```ignore
//! let config = KeycloakConfig::new("https://sso.example.com", "social")
//!     .with_audience("notification-relay");
//!
//! let validator = KeycloakSessionValidator::new(config)?;
//! let user = validator.validate("eyJ...").await?;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{
    decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, TokenData, Validation,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

const DEFAULT_JWKS_CACHE: Duration = Duration::from_secs(3600);
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Minimum spacing of refetches triggered by an unknown `kid`.
const KID_REFRESH_COOLDOWN: Duration = Duration::from_secs(30);

/// Configuration for the Keycloak adapter.
#[derive(Debug, Clone)]
pub struct KeycloakConfig {
    /// Keycloak base URL, e.g. `https://sso.example.com`
    pub base_url: String,

    pub realm: String,

    /// Required `aud` value. Audience is not checked when unset.
    pub audience: Option<String>,

    /// How long to cache JWKS before refetching. Defaults to 1 hour.
    pub jwks_cache_duration: Option<Duration>,
}

impl KeycloakConfig {
    pub fn new(base_url: impl Into<String>, realm: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            realm: realm.into(),
            audience: None,
            jwks_cache_duration: None,
        }
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_cache_duration(mut self, duration: Duration) -> Self {
        self.jwks_cache_duration = Some(duration);
        self
    }

    /// Expected `iss` claim for tokens minted by this realm.
    pub fn issuer(&self) -> String {
        format!("{}/realms/{}", self.base_url.trim_end_matches('/'), self.realm)
    }

    fn jwks_url(&self) -> String {
        format!("{}/protocol/openid-connect/certs", self.issuer())
    }
}

/// JWT claims carried by Keycloak access tokens.
#[derive(Debug, Serialize, Deserialize)]
struct KeycloakClaims {
    sub: String,
    iss: String,
    exp: i64,

    #[serde(default)]
    email: Option<String>,

    #[serde(default)]
    preferred_username: Option<String>,
}

/// Cached JWKS with expiry tracking.
struct JwksCache {
    jwks: JwkSet,
    fetched_at: Instant,
    cache_duration: Duration,
    /// Last fetch or unknown-`kid` refetch attempt, successful or not.
    kid_refresh_at: Option<Instant>,
}

impl JwksCache {
    fn new(jwks: JwkSet, cache_duration: Duration) -> Self {
        let now = Instant::now();
        Self {
            jwks,
            fetched_at: now,
            cache_duration,
            kid_refresh_at: Some(now),
        }
    }

    fn is_expired(&self) -> bool {
        self.fetched_at.elapsed() > self.cache_duration
    }

    fn kid_refresh_allowed(&self) -> bool {
        self.kid_refresh_at
            .map_or(true, |at| at.elapsed() >= KID_REFRESH_COOLDOWN)
    }
}

/// Keycloak session validator.
///
/// Keys are fetched lazily on first validation, so construction never
/// touches the network.
pub struct KeycloakSessionValidator {
    config: KeycloakConfig,
    issuer: String,
    http_client: reqwest::Client,
    jwks_cache: Arc<RwLock<Option<JwksCache>>>,
}

impl KeycloakSessionValidator {
    /// # Errors
    ///
    /// `ServiceUnavailable` if the HTTP client cannot be built.
    pub fn new(config: KeycloakConfig) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .map_err(|e| AuthError::service_unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            issuer: config.issuer(),
            config,
            http_client,
            jwks_cache: Arc::new(RwLock::new(None)),
        })
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let url = self.config.jwks_url();

        tracing::debug!(url = %url, "Fetching JWKS");

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch JWKS");
            AuthError::service_unavailable(format!("Failed to fetch JWKS: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(%status, "JWKS endpoint returned error status");
            return Err(AuthError::service_unavailable(format!(
                "JWKS endpoint returned {}",
                status
            )));
        }

        let jwks: JwkSet = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse JWKS");
            AuthError::service_unavailable(format!("Failed to parse JWKS: {}", e))
        })?;

        tracing::debug!(keys = jwks.keys.len(), "Fetched JWKS");

        Ok(jwks)
    }

    /// Cached keys while fresh, otherwise a refetch.
    ///
    /// The flag is true when the keys were just fetched. Refetches are
    /// serialized on the cache write lock.
    async fn current_jwks(&self) -> Result<(JwkSet, bool), AuthError> {
        if let Some(cached) = self.jwks_cache.read().await.as_ref() {
            if !cached.is_expired() {
                return Ok((cached.jwks.clone(), false));
            }
        }

        let mut cache = self.jwks_cache.write().await;
        if let Some(cached) = cache.as_ref() {
            if !cached.is_expired() {
                // Refreshed while this request waited for the lock.
                return Ok((cached.jwks.clone(), true));
            }
        }
        Ok((self.store_fetched(&mut cache).await?, true))
    }

    async fn store_fetched(&self, cache: &mut Option<JwksCache>) -> Result<JwkSet, AuthError> {
        let jwks = self.fetch_jwks().await?;
        let duration = self.config.jwks_cache_duration.unwrap_or(DEFAULT_JWKS_CACHE);
        *cache = Some(JwksCache::new(jwks.clone(), duration));
        Ok(jwks)
    }

    /// Keys that should contain `kid`.
    ///
    /// Keycloak rotates realm keys, so a token signed with a key newer than
    /// the cache triggers a refetch. The `kid` comes from an unverified
    /// header, so such refetches are limited to one per cooldown window.
    async fn jwks_for(&self, kid: Option<&str>) -> Result<JwkSet, AuthError> {
        let (jwks, fresh) = self.current_jwks().await?;
        match kid {
            Some(kid) if !fresh && jwks.find(kid).is_none() => self.refresh_for_kid(kid).await,
            _ => Ok(jwks),
        }
    }

    async fn refresh_for_kid(&self, kid: &str) -> Result<JwkSet, AuthError> {
        let mut cache = self.jwks_cache.write().await;
        if let Some(cached) = cache.as_mut() {
            if cached.jwks.find(kid).is_some() || !cached.kid_refresh_allowed() {
                return Ok(cached.jwks.clone());
            }
            cached.kid_refresh_at = Some(Instant::now());
        }

        tracing::info!(kid = %kid, "Signing key not cached, refreshing JWKS");
        self.store_fetched(&mut cache).await
    }

    fn find_decoding_key(
        &self,
        header: &jsonwebtoken::Header,
        jwks: &JwkSet,
    ) -> Result<(DecodingKey, Algorithm), AuthError> {
        let kid = header.kid.as_ref().ok_or_else(|| {
            tracing::warn!("JWT missing 'kid' header");
            AuthError::InvalidToken
        })?;

        let jwk = jwks.find(kid).ok_or_else(|| {
            tracing::warn!(kid = %kid, "No matching key in JWKS");
            AuthError::InvalidToken
        })?;

        let algorithm = match jwk.common.key_algorithm {
            Some(jsonwebtoken::jwk::KeyAlgorithm::RS256) | None => Algorithm::RS256,
            Some(jsonwebtoken::jwk::KeyAlgorithm::RS384) => Algorithm::RS384,
            Some(jsonwebtoken::jwk::KeyAlgorithm::RS512) => Algorithm::RS512,
            Some(jsonwebtoken::jwk::KeyAlgorithm::ES256) => Algorithm::ES256,
            Some(jsonwebtoken::jwk::KeyAlgorithm::ES384) => Algorithm::ES384,
            Some(other) => {
                tracing::warn!(algorithm = ?other, "Unsupported JWK algorithm");
                return Err(AuthError::InvalidToken);
            }
        };

        let decoding_key = DecodingKey::from_jwk(jwk).map_err(|e| {
            tracing::warn!(error = %e, "Failed to create decoding key");
            AuthError::InvalidToken
        })?;

        Ok((decoding_key, algorithm))
    }

    fn validate_token(
        &self,
        token: &str,
        decoding_key: &DecodingKey,
        algorithm: Algorithm,
    ) -> Result<TokenData<KeycloakClaims>, AuthError> {
        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[&self.issuer]);
        match &self.config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        decode::<KeycloakClaims>(token, decoding_key, &validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidIssuer => {
                    tracing::warn!("Invalid issuer in token");
                    AuthError::InvalidToken
                }
                ErrorKind::InvalidAudience => {
                    tracing::warn!("Invalid audience in token");
                    AuthError::InvalidToken
                }
                _ => {
                    tracing::warn!(error = %e, "Token validation failed");
                    AuthError::InvalidToken
                }
            }
        })
    }
}

fn user_from_claims(claims: KeycloakClaims) -> Result<AuthenticatedUser, AuthError> {
    let user_id: UserId = claims.sub.parse().map_err(|_| {
        tracing::warn!(sub = %claims.sub, "Token subject is not a user UUID");
        AuthError::InvalidToken
    })?;

    let mut user = AuthenticatedUser::new(user_id);
    if let Some(email) = claims.email {
        user = user.with_email(email);
    }
    if let Some(username) = claims.preferred_username {
        user = user.with_username(username);
    }
    Ok(user)
}

#[async_trait]
impl SessionValidator for KeycloakSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let header = decode_header(token).map_err(|e| {
            tracing::debug!(error = %e, "Failed to decode JWT header");
            AuthError::InvalidToken
        })?;

        let jwks = self.jwks_for(header.kid.as_deref()).await?;
        let (decoding_key, algorithm) = self.find_decoding_key(&header, &jwks)?;
        let token_data = self.validate_token(token, &decoding_key, algorithm)?;

        user_from_claims(token_data.claims)
    }
}

impl std::fmt::Debug for KeycloakSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeycloakSessionValidator")
            .field("issuer", &self.issuer)
            .field("audience", &self.config.audience)
            .finish_non_exhaustive()
    }
}
