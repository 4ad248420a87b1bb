//! Authentication adapters.
//!
//! Implementations of the `SessionValidator` port:
//!
//! - `keycloak` - Production Keycloak realm JWKS validation
//! - `mock` - Test implementation that doesn't require external services

mod keycloak;
mod mock;

pub use keycloak::{KeycloakConfig, KeycloakSessionValidator};
pub use mock::MockSessionValidator;
