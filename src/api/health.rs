//! Health check endpoints for Kubernetes probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::api::types::Json;
use crate::domain::cache::CapabilityStatus;

use super::state::AppState;

/// Detailed health response with component status
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health check
#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Simple health check - returns 200 if the service is running
pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
        latency_ms: None,
    };

    (StatusCode::OK, Json(response))
}

/// Readiness check.
///
/// The cache always serves from memory, so a degraded persistent tier still
/// answers 200 with `degraded` in the body.
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let mut checks = vec![HealthCheck {
        name: "memory_cache".to_string(),
        status: HealthStatus::Healthy,
        message: None,
        latency_ms: None,
    }];

    if state.cache.has_persistent_tier() {
        let status = state.cache.capability().await;
        checks.push(persistent_check(&status, start.elapsed().as_millis() as u64));
    }

    let overall_status = if checks.iter().all(|c| c.status == HealthStatus::Healthy) {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    let response = HealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(checks),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    (StatusCode::OK, Json(response))
}

/// Liveness check - simple check to verify the service is running
pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

fn persistent_check(status: &CapabilityStatus, latency_ms: u64) -> HealthCheck {
    let (status, message) = if !status.available {
        (HealthStatus::Unhealthy, Some("Persistent cache unavailable".to_string()))
    } else if status.read_only {
        (HealthStatus::Degraded, Some("Persistent cache is read-only".to_string()))
    } else {
        (HealthStatus::Healthy, None)
    };

    HealthCheck {
        name: "persistent_cache".to_string(),
        status,
        message,
        latency_ms: Some(latency_ms),
    }
}
