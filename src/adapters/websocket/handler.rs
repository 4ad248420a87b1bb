//! WebSocket upgrade handler for live notification delivery.
//!
//! Connection lifecycle:
//! 1. Auth middleware resolves the caller (header or `?token=`)
//! 2. Upgrade to WebSocket
//! 3. Register the connection with the hub, replacing any older one
//! 4. Write queued notifications until either side stops
//! 5. Unregister (only if still current) and close

use std::sync::Arc;

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
    routing::get,
    Router,
};
use futures::StreamExt;

use crate::adapters::http::middleware::RequireAuth;

use super::{
    connection::{Connection, ConnectionSettings},
    hub::ConnectionHub,
};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub hub: Arc<ConnectionHub>,
    pub settings: ConnectionSettings,
}

impl WebSocketState {
    pub fn new(hub: Arc<ConnectionHub>, settings: ConnectionSettings) -> Self {
        Self { hub, settings }
    }
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /ws`
///
/// Unauthenticated callers are rejected with 401 before the upgrade.
pub async fn ws_handler(
    RequireAuth(user): RequireAuth,
    State(state): State<WebSocketState>,
    ws: WebSocketUpgrade,
) -> Response {
    let user_id = user.id;
    tracing::debug!(user_id = %user_id, "Upgrading notification socket");

    ws.on_upgrade(move |socket| async move {
        let (sink, stream) = socket.split();
        Connection::new(user_id, &state.settings)
            .serve(sink, stream, state.hub)
            .await;
    })
}

/// Create axum router for the WebSocket endpoint.
pub fn websocket_router() -> Router<WebSocketState> {
    Router::new().route("/ws", get(ws_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn state() -> WebSocketState {
        WebSocketState::new(Arc::new(ConnectionHub::new()), ConnectionSettings::default())
    }

    #[test]
    fn websocket_state_shares_hub() {
        let hub = Arc::new(ConnectionHub::new());
        let state = WebSocketState::new(hub.clone(), ConnectionSettings::default());

        assert!(Arc::ptr_eq(&state.hub, &hub));
    }

    #[tokio::test]
    async fn upgrade_without_credentials_is_rejected() {
        let app = websocket_router().with_state(state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/ws")
                    .header("connection", "upgrade")
                    .header("upgrade", "websocket")
                    .header("sec-websocket-version", "13")
                    .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
