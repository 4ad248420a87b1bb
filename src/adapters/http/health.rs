//! Liveness endpoint.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::adapters::websocket::{ConnectionHub, DeliveryStats};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub connections: usize,
    pub delivery: DeliverySummary,
}

#[derive(Debug, Serialize)]
pub struct DeliverySummary {
    pub queued: u64,
    pub dropped_full: u64,
    pub offline: u64,
}

impl From<DeliveryStats> for DeliverySummary {
    fn from(stats: DeliveryStats) -> Self {
        Self {
            queued: stats.queued,
            dropped_full: stats.dropped_full,
            offline: stats.offline,
        }
    }
}

/// GET /health
pub async fn health(State(hub): State<Arc<ConnectionHub>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connections: hub.connection_count().await,
        delivery: hub.stats().into(),
    })
}

pub fn health_routes(hub: Arc<ConnectionHub>) -> Router {
    Router::new().route("/health", get(health)).with_state(hub)
}
