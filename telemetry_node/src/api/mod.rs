//! HTTP surface: axum router, handlers and the JSON error envelope

pub mod errors;
pub mod handlers;
pub mod server;
pub mod validation;

pub use errors::{ApiError, ApiResult};
pub use server::{create_router, ApiServer, AppState};
