//! KrushiAI recommender HTTP service
//!
//! One process serves one recommender (crop, fertilizer or plant disease):
//! - `server`: Router, prediction handlers and graceful shutdown
//! - `config`: Layered configuration (defaults, file, environment, CLI)
//! - `health`: Health report for `/health`
//! - `metrics`: Request counters exposed on `/metrics`
//! - `errors`: Startup errors and the HTTP error envelope

pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod server;

pub use config::{AllowedOrigins, ConfigManager, ConfigOverrides, Environment, ServiceConfig};
pub use errors::{ApiError, ServiceError};
pub use health::{health_report, HealthResponse, HealthStatus};
pub use metrics::{MetricsCollector, MetricsSnapshot, Outcome};
pub use server::{build_router, serve, AppState, ModelState, SharedState};

/// Service version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
