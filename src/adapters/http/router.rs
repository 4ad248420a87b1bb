//! Top-level router for the relay.
//!
//! ```text
//! /health                  no auth
//! /ws                      auth (header or ?token=), upgrade
//! /api/notifications/...   auth
//! ```
//!
//! Cross-cutting layers (tracing, request ids, CORS, timeouts) are added by
//! the binary, not here, so tests can drive the bare routes.

use std::sync::Arc;

use axum::{middleware, Router};

use crate::adapters::websocket::{websocket_router, ConnectionHub, ConnectionSettings, WebSocketState};
use crate::application::NotificationService;

use super::health::health_routes;
use super::middleware::{auth_middleware, AuthState};
use super::notification::{notification_routes, NotificationHandlers};

/// Everything the routes need, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<NotificationService>,
    pub hub: Arc<ConnectionHub>,
    pub validator: AuthState,
    pub connection_settings: ConnectionSettings,
}

/// Build the application router.
///
/// The hub is shared by the push endpoint, the upgrade endpoint and the
/// health report; all three see the same registry.
pub fn app_router(state: AppState) -> Router {
    let handlers = NotificationHandlers::new(state.service.clone(), state.hub.clone());
    let ws_state = WebSocketState::new(state.hub.clone(), state.connection_settings.clone());

    let authenticated = Router::new()
        .nest("/api/notifications", notification_routes(handlers))
        .merge(websocket_router().with_state(ws_state))
        .layer(middleware::from_fn_with_state(
            state.validator.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health_routes(state.hub))
        .merge(authenticated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockSessionValidator;
    use crate::adapters::storage::InMemoryNotificationStore;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState {
            service: Arc::new(NotificationService::new(Arc::new(
                InMemoryNotificationStore::new(),
            ))),
            hub: Arc::new(ConnectionHub::new()),
            validator: Arc::new(MockSessionValidator::new()),
            connection_settings: ConnectionSettings::default(),
        }
    }

    async fn status(uri: &str) -> StatusCode {
        app_router(state())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn health_needs_no_credentials() {
        assert_eq!(status("/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn notification_routes_need_credentials() {
        assert_eq!(status("/api/notifications").await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        assert_eq!(status("/api/unknown").await, StatusCode::NOT_FOUND);
    }
}
