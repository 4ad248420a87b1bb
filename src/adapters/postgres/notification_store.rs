//! PostgreSQL implementation of NotificationStore.
//!
//! Persists notifications to the `notifications` table (see `migrations/`).

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::foundation::{DomainError, NotificationId, Timestamp, UserId};
use crate::domain::notification::Notification;
use crate::ports::NotificationStore;

/// PostgreSQL implementation of NotificationStore.
#[derive(Clone)]
pub struct PostgresNotificationStore {
    pool: PgPool,
}

impl PostgresNotificationStore {
    /// Creates a new PostgresNotificationStore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PostgresNotificationStore {
    async fn create(&self, notification: &Notification) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, user_id, title, message, type, is_read, created_at, read_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(notification.id().as_uuid())
        .bind(notification.user_id().as_uuid())
        .bind(notification.title())
        .bind(notification.message())
        .bind(notification.notification_type())
        .bind(notification.is_read())
        .bind(notification.created_at().as_datetime())
        .bind(notification.read_at().map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to insert notification", e))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &NotificationId) -> Result<Option<Notification>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, title, message, type, is_read, created_at, read_at
            FROM notifications
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch notification", e))?;

        row.map(row_to_notification).transpose()
    }

    async fn find_by_user(
        &self,
        user_id: &UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Notification>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, title, message, type, is_read, created_at, read_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list notifications", e))?;

        rows.into_iter().map(row_to_notification).collect()
    }

    async fn mark_read(
        &self,
        id: &NotificationId,
        read_at: Timestamp,
    ) -> Result<Timestamp, DomainError> {
        // COALESCE keeps the first read_at if two requests race.
        let row = sqlx::query(
            r#"
            UPDATE notifications SET
                is_read = TRUE,
                read_at = COALESCE(read_at, $2)
            WHERE id = $1
            RETURNING read_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(read_at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to mark notification read", e))?
        .ok_or_else(|| DomainError::notification_not_found(id))?;

        let stored: chrono::DateTime<chrono::Utc> = column(&row, "read_at")?;
        Ok(Timestamp::from_datetime(stored))
    }

    async fn delete(&self, id: &NotificationId) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to delete notification", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::notification_not_found(id));
        }

        Ok(())
    }
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| DomainError::database(&format!("Failed to get {}", name), e))
}

fn row_to_notification(row: PgRow) -> Result<Notification, DomainError> {
    let id: uuid::Uuid = column(&row, "id")?;
    let user_id: uuid::Uuid = column(&row, "user_id")?;
    let title: String = column(&row, "title")?;
    let message: String = column(&row, "message")?;
    let notification_type: String = column(&row, "type")?;
    let is_read: bool = column(&row, "is_read")?;
    let created_at: chrono::DateTime<chrono::Utc> = column(&row, "created_at")?;
    let read_at: Option<chrono::DateTime<chrono::Utc>> = column(&row, "read_at")?;

    let user_id = UserId::new(user_id)
        .map_err(|e| DomainError::database("Stored notification has invalid user_id", e))?;

    Ok(Notification::reconstitute(
        NotificationId::from_uuid(id),
        user_id,
        title,
        message,
        notification_type,
        is_read,
        Timestamp::from_datetime(created_at),
        read_at.map(Timestamp::from_datetime),
    ))
}
