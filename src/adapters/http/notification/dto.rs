//! Request and response DTOs for notification endpoints.

use serde::{Deserialize, Serialize};

use crate::application::NotificationPage;
use crate::domain::foundation::Timestamp;
use crate::domain::notification::Notification;
use crate::ports::SendOutcome;

// ════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════

/// Body of `POST /api/notifications`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNotificationRequest {
    pub title: String,
    pub message: String,
    #[serde(default, rename = "type")]
    pub notification_type: Option<String>,
}

/// Query of `GET /api/notifications`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListNotificationsQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Body of `POST /api/notifications/push`.
#[derive(Debug, Clone, Deserialize)]
pub struct PushMessageRequest {
    pub user_id: String,
    pub message: String,
}

// ════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct NotificationResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub is_read: bool,
    pub created_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<Timestamp>,
}

impl From<&Notification> for NotificationResponse {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id().to_string(),
            user_id: n.user_id().to_string(),
            title: n.title().to_string(),
            message: n.message().to_string(),
            notification_type: n.notification_type().to_string(),
            is_read: n.is_read(),
            created_at: *n.created_at(),
            read_at: n.read_at().copied(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationListResponse {
    pub items: Vec<NotificationResponse>,
    pub limit: u32,
    pub offset: u32,
}

impl From<NotificationPage> for NotificationListResponse {
    fn from(page: NotificationPage) -> Self {
        Self {
            items: page.items.iter().map(NotificationResponse::from).collect(),
            limit: page.limit,
            offset: page.offset,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkReadResponse {
    pub status: &'static str,
    pub read_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushMessageResponse {
    pub status: &'static str,
    pub user_id: String,
    pub outcome: SendOutcome,
}

/// Error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self {
            code: "VALIDATION_FAILED".to_string(),
            message: message.into(),
            details: Some(serde_json::json!({ "field": field })),
        }
    }

    pub fn not_found(resource_type: &str, id: &str) -> Self {
        Self {
            code: "NOT_FOUND".to_string(),
            message: format!("{} not found: {}", resource_type, id),
            details: None,
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            code: "FORBIDDEN".to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            details: None,
        }
    }
}
