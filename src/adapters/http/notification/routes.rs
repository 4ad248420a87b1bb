//! HTTP routes for notification endpoints.

use axum::{
    routing::{get, patch, post},
    Router,
};

use super::handlers::{
    create_notification, delete_notification, get_notification, list_notifications,
    mark_notification_read, push_message, NotificationHandlers,
};

/// Creates the notification router, to be nested under `/api/notifications`.
pub fn notification_routes(handlers: NotificationHandlers) -> Router {
    Router::new()
        .route("/", post(create_notification).get(list_notifications))
        .route("/push", post(push_message))
        .route("/:id", get(get_notification).delete(delete_notification))
        .route("/:id/read", patch(mark_notification_read))
        .with_state(handlers)
}
