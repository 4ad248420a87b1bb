//! Authentication domain types.
//!
//! These types describe the caller identity once a token has been verified.
//! They carry no provider-specific data; `AuthError` is phrased from the
//! application's point of view, not the identity provider's.

use super::UserId;
use thiserror::Error;

/// Authenticated user extracted from a validated JWT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The recipient identity (`sub` claim).
    pub id: UserId,

    /// Email claim, if the provider includes it.
    pub email: Option<String>,

    /// `preferred_username` claim, if present.
    pub username: Option<String>,
}

impl AuthenticatedUser {
    /// Creates an authenticated user with only an identity.
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            email: None,
            username: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// Authentication errors that can occur during token validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired (separate from InvalidToken for specific handling).
    #[error("Token expired")]
    TokenExpired,

    /// The authentication service is unavailable (network, config, etc.).
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn authenticated_user_builder_sets_claims() {
        let id = UserId::new(Uuid::new_v4()).unwrap();
        let user = AuthenticatedUser::new(id)
            .with_email("alice@example.com")
            .with_username("alice");

        assert_eq!(user.id, id);
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
        assert_eq!(user.username.as_deref(), Some("alice"));
    }

    #[test]
    fn auth_error_service_unavailable_displays_message() {
        let err = AuthError::service_unavailable("Connection refused");
        assert_eq!(format!("{}", err), "Auth service unavailable: Connection refused");
    }
}
