//! Service Routes
//!
//! Root banner, health check and Prometheus metrics.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::AppState;

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
    pub metrics: ServiceMetrics,
}

/// Component status
#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub inference: ComponentHealth,
    pub database: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    pub detail: Option<String>,
}

/// Service counters
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceMetrics {
    pub logged_queries: Option<i64>,
    pub inference_permits_available: usize,
}

/// Banner for `GET /`
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Sentiment query API is running. POST to /query"
    }))
}

/// Health check handler
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let database_ok = match state.repository.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Health check: database unreachable: {}", e);
            false
        }
    };
    let logged_queries = if database_ok {
        state.repository.count(None).await.ok()
    } else {
        None
    };

    let response = HealthResponse {
        status: if database_ok { "healthy" } else { "unhealthy" }.to_string(),
        timestamp: chrono::Utc::now().timestamp(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus {
            inference: ComponentHealth {
                status: "ok".to_string(),
                detail: Some(state.inference.classifier_name().to_string()),
            },
            database: ComponentHealth {
                status: if database_ok { "ok" } else { "error" }.to_string(),
                detail: None,
            },
        },
        metrics: ServiceMetrics {
            logged_queries,
            inference_permits_available: state.inference.available_permits(),
        },
    };

    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Prometheus exposition, when a recorder is installed
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
