//! Liveness and ledger connectivity endpoints

use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{SecondsFormat, Utc};
use log::{error, info};
use serde::Serialize;

use crate::api::server::AppState;

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Liveness response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current time, ISO-8601
    pub timestamp: String,
    /// Process uptime in seconds
    pub uptime: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStatus {
    pub connected: bool,
    pub contract_address: String,
    pub total_readings: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorsStatus {
    pub allowed_origins: Vec<String>,
}

/// Connectivity report for `GET /api/test`
#[derive(Debug, Serialize)]
pub struct DiagnosticsResponse {
    pub status: String,
    pub message: String,
    pub blockchain: LedgerStatus,
    pub cors: CorsStatus,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct DiagnosticsFailure {
    pub status: String,
    pub message: String,
    pub error: String,
}

/// Handler for `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: now_iso(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}

/// Handler for `GET /api/test`: touches the ledger once and reports the
/// effective CORS origins
pub async fn diagnostics(
    State(state): State<AppState>,
) -> Result<Json<DiagnosticsResponse>, (StatusCode, Json<DiagnosticsFailure>)> {
    match state.pipeline.count().await {
        Ok(total) => {
            info!("Diagnostics: ledger reachable, {} readings", total);
            Ok(Json(DiagnosticsResponse {
                status: "ok".to_string(),
                message: "API is working correctly".to_string(),
                blockchain: LedgerStatus {
                    connected: true,
                    contract_address: state.contract_address.clone(),
                    total_readings: total,
                },
                cors: CorsStatus {
                    allowed_origins: state.allowed_origins.to_vec(),
                },
                timestamp: now_iso(),
            }))
        }
        Err(e) => {
            error!("Diagnostics: ledger connection failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(DiagnosticsFailure {
                    status: "error".to_string(),
                    message: "Blockchain connection failed".to_string(),
                    error: e.to_string(),
                }),
            ))
        }
    }
}
