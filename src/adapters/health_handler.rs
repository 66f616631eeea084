use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::adapters::tool_handler::BridgeToolHandler;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub server: String,
    pub dialogflow: String,
}

pub struct HealthHandler {
    tools: Arc<BridgeToolHandler>,
    start_time: std::time::Instant,
}

impl HealthHandler {
    pub fn new(tools: Arc<BridgeToolHandler>) -> Self {
        Self {
            tools,
            start_time: std::time::Instant::now(),
        }
    }

    /// Basic health check - returns 200 if server is running
    pub async fn health(&self) -> impl IntoResponse {
        let uptime = self.start_time.elapsed().as_secs();
        let dialogflow = if self.tools.initialized().await {
            "initialized"
        } else {
            "not_initialized"
        };
        let status = HealthStatus {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: uptime,
            checks: HealthChecks {
                server: "ok".to_string(),
                dialogflow: dialogflow.to_string(),
            },
        };

        (StatusCode::OK, Json(status))
    }

    /// Readiness check - returns 200 once a Dialogflow client is bound,
    /// either from startup configuration or via the initialize tool
    pub async fn ready(&self) -> impl IntoResponse {
        if self.tools.initialized().await {
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "status": "ready",
                    "message": "Dialogflow client is initialized"
                })),
            )
        } else {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "not_ready",
                    "message": "Dialogflow client not initialized. Call initialize_dialogflow or configure an agent"
                })),
            )
        }
    }

    /// Liveness check - returns 200 if server is alive
    pub async fn live(&self) -> impl IntoResponse {
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "alive",
                "message": "Server is alive"
            })),
        )
    }
}
