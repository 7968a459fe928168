//! Axum HTTP API server.
//!
//! This crate provides:
//! - Video upload into the local upload store
//! - Full and segment analysis endpoints backed by Gemini
//! - Rate limiting and security headers
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::{AppState, StartupError};
