//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Unique identifier for a notification record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(Uuid);

impl NotificationId {
    /// Creates a new random NotificationId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a NotificationId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NotificationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identity of a notification recipient.
///
/// Always a non-nil UUID. The identity provider's `sub` claim and the
/// broker event payloads both carry it in this form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Uuid", into = "Uuid")]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a UserId, rejecting the nil UUID.
    pub fn new(uuid: Uuid) -> Result<Self, ValidationError> {
        if uuid.is_nil() {
            return Err(ValidationError::empty_field("user_id"));
        }
        Ok(Self(uuid))
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::parse_str(s.trim())
            .map_err(|e| ValidationError::invalid_format("user_id", e.to_string()))?;
        Self::new(uuid)
    }
}

impl TryFrom<Uuid> for UserId {
    type Error = ValidationError;

    fn try_from(uuid: Uuid) -> Result<Self, Self::Error> {
        Self::new(uuid)
    }
}

impl From<UserId> for Uuid {
    fn from(id: UserId) -> Self {
        id.0
    }
}
