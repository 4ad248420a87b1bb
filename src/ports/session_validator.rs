//! Session validation port for JWT token validation.
//!
//! This port defines the contract for validating access tokens and extracting
//! user identity. It is provider-agnostic: the production adapter verifies
//! Keycloak-issued tokens against the realm JWKS, and a mock exists for tests.
//!
//! All implementations MUST validate:
//! - **Issuer (iss)**: Token must come from expected auth provider
//! - **Expiry (exp)**: Token must not be expired
//! - **Audience (aud)**: When one is configured

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Validates access tokens and extracts user identity.
///
/// HTTP middleware uses this to validate Bearer tokens before any
/// notification route or the WebSocket upgrade runs.
///
/// # Contract
///
/// - `AuthError::InvalidToken` for malformed/bad signature tokens
/// - `AuthError::TokenExpired` for expired tokens
/// - `AuthError::ServiceUnavailable` for transient errors
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a JWT access token (without the "Bearer " prefix).
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
