//! Bearer-token authentication for axum routes.
//!
//! `auth_middleware` resolves a token to an [`AuthenticatedUser`] through the
//! `SessionValidator` port and stores it in the request extensions. Handlers
//! opt in with the [`RequireAuth`] extractor, so routes mounted under the
//! same layer may still be public.
//!
//! ```text
//! Authorization: Bearer <token>   (preferred)
//! GET /ws?token=<token>           (browsers cannot set headers on upgrade)
//! ```
//!
//! Every rejection is a JSON body `{"code": ..., "message": ...}`.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query, Request, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::SessionValidator;

pub type AuthState = Arc<dyn SessionValidator>;

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Resolve the caller, if a token was sent.
///
/// A request without a token passes through untouched. A request with a
/// token that does not validate is answered here and never reaches the
/// handler.
pub async fn auth_middleware(
    State(validator): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_token(&request) else {
        return next.run(request).await;
    };

    match validator.validate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => AuthRejection::from(e).into_response(),
    }
}

/// Header first, then `?token=`. Blank values count as absent.
fn extract_token(request: &Request) -> Option<String> {
    let from_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = from_header {
        return Some(token.to_string());
    }

    Query::<TokenQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(query)| query.token)
        .filter(|token| !token.is_empty())
}

/// The caller, as resolved by [`auth_middleware`]. Rejects with 401 if absent.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(RequireAuth)
            .ok_or(AuthRejection::Unauthenticated)
    }
}

/// Why a request was refused before reaching its handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    /// No token was sent to a route that needs one.
    Unauthenticated,
    InvalidToken,
    TokenExpired,
    /// The validator could not reach the identity provider.
    ValidatorUnavailable,
}

impl AuthRejection {
    fn status(&self) -> StatusCode {
        match self {
            AuthRejection::ValidatorUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AuthRejection::Unauthenticated => "UNAUTHENTICATED",
            AuthRejection::InvalidToken => "INVALID_TOKEN",
            AuthRejection::TokenExpired => "TOKEN_EXPIRED",
            AuthRejection::ValidatorUnavailable => "AUTH_UNAVAILABLE",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            AuthRejection::Unauthenticated => "Authentication required",
            AuthRejection::InvalidToken => "Invalid token",
            AuthRejection::TokenExpired => "Token expired",
            AuthRejection::ValidatorUnavailable => "Authentication service unavailable",
        }
    }
}

impl From<AuthError> for AuthRejection {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidToken => AuthRejection::InvalidToken,
            AuthError::TokenExpired => AuthRejection::TokenExpired,
            AuthError::ServiceUnavailable(reason) => {
                tracing::error!(error = %reason, "Session validator unavailable");
                AuthRejection::ValidatorUnavailable
            }
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(serde_json::json!({
                "code": self.code(),
                "message": self.message(),
            })),
        )
            .into_response()
    }
}
