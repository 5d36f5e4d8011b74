use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::Json,
};
use log::{error, info, warn};
use serde::Serialize;

use crate::api::errors::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::api::validation::{parse_index, HistoryParams, StatsParams};
use crate::ledger::RawRecord;
use crate::pipeline::{FormattedReading, HistoryPage, ReadingError, ReadingStats};

/// Response for `GET /api/readings/count`
#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub total: u64,
}

/// Undecrypted record with byte fields as `0x`-prefixed hex
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReadingResponse {
    pub index: u64,
    pub device_id: String,
    pub ciphertext: String,
    pub nonce: String,
    pub signature: String,
    pub timestamp: u64,
    pub block_number: u64,
}

impl RawReadingResponse {
    pub fn new(index: u64, record: RawRecord) -> Self {
        let hex0x = |bytes: &[u8]| format!("0x{}", hex::encode(bytes));
        Self {
            index,
            ciphertext: hex0x(&record.ciphertext),
            nonce: hex0x(&record.nonce),
            signature: hex0x(&record.signature),
            device_id: record.device_id,
            timestamp: record.timestamp,
            block_number: record.block_number,
        }
    }
}

fn reject(err: ReadingError, context: &str) -> ApiError {
    let api_error = ApiError::from_reading(err, context);
    if api_error.is_server_error() {
        error!("{}: {}", context, api_error);
    } else {
        warn!("{}", api_error);
    }
    api_error
}

/// Handler for `GET /api/readings/latest/decrypt`
pub async fn get_latest_reading(State(state): State<AppState>) -> ApiResult<Json<FormattedReading>> {
    let reading = state
        .pipeline
        .latest()
        .await
        .map_err(|e| reject(e, "Failed to fetch and decrypt latest reading"))?;
    info!("Served latest reading (block {})", reading.block_number);
    Ok(Json(reading))
}

/// Handler for `GET /api/readings/:index/decrypt`
pub async fn get_reading(
    State(state): State<AppState>,
    index: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<FormattedReading>> {
    let Path(index) = index?;
    let index = parse_index(&index)?;
    let reading = state
        .pipeline
        .reading(index)
        .await
        .map_err(|e| reject(e, "Failed to fetch and decrypt reading"))?;
    Ok(Json(reading))
}

/// Handler for `GET /api/readings/:index/raw`
pub async fn get_raw_reading(
    State(state): State<AppState>,
    index: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<RawReadingResponse>> {
    let Path(index) = index?;
    let index = parse_index(&index)?;
    let record = state
        .pipeline
        .raw_record(index)
        .await
        .map_err(|e| reject(e, "Failed to fetch reading"))?;
    Ok(Json(RawReadingResponse::new(index, record)))
}

/// Handler for `GET /api/readings/history?limit=&offset=`
pub async fn get_history(
    State(state): State<AppState>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> ApiResult<Json<HistoryPage>> {
    let Query(params) = params?;
    let query = params.to_query()?;
    let page = state
        .pipeline
        .history(query)
        .await
        .map_err(|e| reject(e, "Failed to fetch history"))?;
    Ok(Json(page))
}

/// Handler for `GET /api/readings/count`
pub async fn get_count(State(state): State<AppState>) -> ApiResult<Json<CountResponse>> {
    let total = state
        .pipeline
        .count()
        .await
        .map_err(|e| reject(e, "Failed to get reading count"))?;
    Ok(Json(CountResponse { total }))
}

/// Handler for `GET /api/readings/stats?limit=`
pub async fn get_stats(
    State(state): State<AppState>,
    params: Result<Query<StatsParams>, QueryRejection>,
) -> ApiResult<Json<ReadingStats>> {
    let Query(params) = params?;
    let stats = state
        .pipeline
        .stats(params.limit())
        .await
        .map_err(|e| reject(e, "Failed to calculate stats"))?;
    Ok(Json(stats))
}
