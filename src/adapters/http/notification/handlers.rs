//! HTTP handlers for notification endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::http::middleware::RequireAuth;
use crate::application::{CreateNotificationCommand, NotificationService};
use crate::domain::foundation::{NotificationId, UserId};
use crate::domain::notification::NotificationError;
use crate::ports::{LiveDelivery, OutboundMessage};

use super::dto::{
    CreateNotificationRequest, ErrorResponse, ListNotificationsQuery, MarkReadResponse,
    NotificationListResponse, NotificationResponse, PushMessageRequest, PushMessageResponse,
    StatusResponse,
};

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct NotificationHandlers {
    service: Arc<NotificationService>,
    delivery: Arc<dyn LiveDelivery>,
}

impl NotificationHandlers {
    pub fn new(service: Arc<NotificationService>, delivery: Arc<dyn LiveDelivery>) -> Self {
        Self { service, delivery }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /api/notifications - Create a notification for the caller
pub async fn create_notification(
    State(handlers): State<NotificationHandlers>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<CreateNotificationRequest>,
) -> Response {
    let cmd = CreateNotificationCommand {
        user_id: *user.id.as_uuid(),
        title: req.title,
        message: req.message,
        notification_type: req.notification_type,
    };

    match handlers.service.create(cmd).await {
        Ok(notification) => (
            StatusCode::CREATED,
            Json(NotificationResponse::from(&notification)),
        )
            .into_response(),
        Err(e) => handle_notification_error(e),
    }
}

/// GET /api/notifications - List the caller's notifications, newest first
pub async fn list_notifications(
    State(handlers): State<NotificationHandlers>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ListNotificationsQuery>,
) -> Response {
    match handlers
        .service
        .list_for_user(&user.id, query.limit, query.offset)
        .await
    {
        Ok(page) => (StatusCode::OK, Json(NotificationListResponse::from(page))).into_response(),
        Err(e) => handle_notification_error(e),
    }
}

/// GET /api/notifications/:id - Get one notification
pub async fn get_notification(
    State(handlers): State<NotificationHandlers>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_notification_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match handlers.service.get(&id, &user.id).await {
        Ok(notification) => {
            (StatusCode::OK, Json(NotificationResponse::from(&notification))).into_response()
        }
        Err(e) => handle_notification_error(e),
    }
}

/// PATCH /api/notifications/:id/read - Mark a notification read
pub async fn mark_notification_read(
    State(handlers): State<NotificationHandlers>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_notification_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match handlers.service.mark_read(&id, &user.id).await {
        Ok(read_at) => (
            StatusCode::OK,
            Json(MarkReadResponse {
                status: "marked as read",
                read_at,
            }),
        )
            .into_response(),
        Err(e) => handle_notification_error(e),
    }
}

/// DELETE /api/notifications/:id - Delete a notification
pub async fn delete_notification(
    State(handlers): State<NotificationHandlers>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_notification_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match handlers.service.delete(&id, &user.id).await {
        Ok(()) => (StatusCode::OK, Json(StatusResponse { status: "deleted" })).into_response(),
        Err(e) => handle_notification_error(e),
    }
}

/// POST /api/notifications/push - Push an ad-hoc text message to a live user
///
/// Callers may only push to their own sockets. Nothing is persisted. The
/// outcome reports what happened to the single delivery attempt; an offline
/// recipient is still a 200.
pub async fn push_message(
    State(handlers): State<NotificationHandlers>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<PushMessageRequest>,
) -> Response {
    let user_id: UserId = match req.user_id.parse() {
        Ok(id) => id,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::validation("user_id", e.to_string())),
            )
                .into_response()
        }
    };

    if user_id != user.id {
        return (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::forbidden("Cannot push messages to another user")),
        )
            .into_response();
    }

    if req.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::validation("message", "Message is required")),
        )
            .into_response();
    }

    let outcome = handlers
        .delivery
        .send_to_user(&user_id, OutboundMessage::text(req.message))
        .await;

    (
        StatusCode::OK,
        Json(PushMessageResponse {
            status: "sent",
            user_id: user_id.to_string(),
            outcome,
        }),
    )
        .into_response()
}

fn parse_notification_id(raw: &str) -> Result<NotificationId, Response> {
    raw.parse::<NotificationId>().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request("Invalid notification ID")),
        )
            .into_response()
    })
}

// ════════════════════════════════════════════════════════════════════════════
// Error handling
// ════════════════════════════════════════════════════════════════════════════

fn handle_notification_error(error: NotificationError) -> Response {
    match &error {
        NotificationError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::not_found("Notification", &id.to_string())),
        )
            .into_response(),
        NotificationError::Forbidden => (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::forbidden(error.message())),
        )
            .into_response(),
        NotificationError::ValidationFailed { field, message } => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::validation(field, message.clone())),
        )
            .into_response(),
        NotificationError::Infrastructure(msg) => {
            tracing::error!(error = %msg, "Notification request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal("An unexpected error occurred")),
            )
                .into_response()
        }
    }
}
