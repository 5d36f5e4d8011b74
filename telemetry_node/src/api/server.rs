use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use log::{error, info, warn};
use std::{any::Any, net::SocketAddr, sync::Arc, time::Instant};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
};

use crate::api::errors::ApiError;
use crate::api::handlers::{health, readings};
use crate::pipeline::ReadingPipeline;

/// Endpoints served by [`create_router`], listed in the startup banner
pub const ENDPOINTS: &[&str] = &[
    "GET /health",
    "GET /api/test",
    "GET /api/readings/latest/decrypt",
    "GET /api/readings/:index/decrypt",
    "GET /api/readings/:index/raw",
    "GET /api/readings/history?limit=&offset=",
    "GET /api/readings/count",
    "GET /api/readings/stats?limit=",
];

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ReadingPipeline>,
    pub contract_address: String,
    pub allowed_origins: Arc<[String]>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(pipeline: ReadingPipeline, contract_address: String, allowed_origins: Vec<String>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            contract_address,
            allowed_origins: allowed_origins.into(),
            started_at: Instant::now(),
        }
    }
}

/// API Server struct
pub struct ApiServer {
    pub port: u16,
    pub state: AppState,
}

impl ApiServer {
    pub fn new(port: u16, state: AppState) -> Self {
        Self { port, state }
    }

    /// Bind, serve until ctrl-c or SIGTERM, then drain in-flight requests
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr).await?;

        info!("Telemetry API listening on http://{}", addr);
        info!("Contract address: {}", self.state.contract_address);
        info!("Allowed origins: {}", self.state.allowed_origins.join(", "));
        info!("Endpoints:");
        for endpoint in ENDPOINTS {
            info!("  {}", endpoint);
        }

        let app = create_router(self.state);
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Telemetry API stopped");
        Ok(())
    }
}

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.allowed_origins);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/test", get(health::diagnostics))
        .route("/api/readings/latest/decrypt", get(readings::get_latest_reading))
        .route("/api/readings/history", get(readings::get_history))
        .route("/api/readings/count", get(readings::get_count))
        .route("/api/readings/stats", get(readings::get_stats))
        .route("/api/readings/:index/decrypt", get(readings::get_reading))
        .route("/api/readings/:index/raw", get(readings::get_raw_reading))
        .fallback(endpoint_not_found)
        .method_not_allowed_fallback(endpoint_not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .with_state(state)
}

/// CORS restricted to the configured origins, credentials allowed
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

async fn endpoint_not_found() -> ApiError {
    ApiError::endpoint_not_found()
}

/// Turn a handler panic into a 500 body
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };
    error!("Unhandled error: {}", detail);
    ApiError::internal_server_error(&detail).into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining connections");
}
