//! HTTP adapter for notification endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{
    CreateNotificationRequest, ErrorResponse, ListNotificationsQuery, MarkReadResponse,
    NotificationListResponse, NotificationResponse, PushMessageRequest, PushMessageResponse,
    StatusResponse,
};
pub use handlers::NotificationHandlers;
pub use routes::notification_routes;
