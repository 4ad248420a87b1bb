//! UTC instants for `created_at` / `read_at`.
//!
//! Broker events carry Unix seconds; the API and the database use RFC 3339.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Strictly earlier than `other`.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// `None` for values chrono cannot represent.
    pub fn from_unix_secs(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0).single().map(Self)
    }

    pub fn as_unix_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Negative `secs` moves backwards.
    pub fn plus_secs(&self, secs: i64) -> Self {
        Self(self.0 + chrono::Duration::seconds(secs))
    }
}
