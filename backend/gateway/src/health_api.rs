//! Gateway Health API

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server::GatewayState;

#[derive(Serialize)]
pub struct HealthReport {
    pub status: String,
    pub backend: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

/// Handler for `GET /api/health`
///
/// Reports `degraded` while the storage credential is missing.
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthReport> {
    let status = if state.is_configured() { "ok" } else { "degraded" };
    Json(HealthReport {
        status: status.into(),
        backend: state.backend().to_string(),
        uptime_seconds: state.uptime().as_secs(),
        timestamp: Utc::now(),
    })
}
