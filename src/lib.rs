//! Floodgate - a webhook intake, verification, and replay service
//!
//! Floodgate is built on top of Axum and Tokio. It receives signed webhook
//! events, records them exactly once, processes their side effects outside
//! the request path with a bounded retry budget, and lets operators replay
//! any recorded event without re-contacting the origin.
//!
//! # Features
//!
//! - **Signature verification**: HMAC-SHA256 with timestamp binding and
//!   constant-time comparison
//! - **Idempotent intake**: duplicate deliveries are acknowledged without
//!   re-processing
//! - **Detached processing**: dispatch runs in its own task under a timeout,
//!   with retry and dead-letter routing on exhaustion
//! - **Replay**: operator-triggered reprocessing from the stored payload
//! - **Testing**: in-process HTTP scenario utilities
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use floodgate::{App, AppContext, ConfigBuilder, webhooks::WebhookModule};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Initialize logging
//!     floodgate::init_tracing();
//!
//!     // Create and configure app
//!     let config = ConfigBuilder::new().from_env().build().unwrap();
//!
//!     let context = AppContext::builder()
//!         .with_webhook_config(config.webhooks.clone())
//!         .build();
//!
//!     // Start server
//!     App::with_config(config)
//!         .with_context(context)
//!         .register_module(WebhookModule)
//!         .serve()
//!         .await
//!         .unwrap();
//! }
//! ```

mod app;
mod config;
mod core;
mod error;
pub mod health;
mod http;
mod middleware;
pub mod testing;
pub mod utils;
pub mod webhooks;

// Re-exports for public API
pub use app::{AppContext, AppContextBuilder};
pub use config::{Config, ConfigBuilder, LoggingConfig, ServerConfig};
pub use core::{App, AppBuilder};
pub use error::{FloodgateError, Result};
pub use health::{ComponentHealth, HealthCheck, HealthChecker, HealthStatus};
pub use http::RouteModule;
pub use webhooks::{
    EventDispatcher, EventProcessor, EventRecord, EventStatus, EventStore, InMemoryEventStore,
    SignatureVerifier, WebhookConfig, WebhookEvent, WebhookModule,
};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// Call this early in your application, typically in main() before creating
/// the App.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "floodgate=debug")
/// - `FLOODGATE_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("FLOODGATE_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing with a custom configuration
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::new(&config.logging.level);

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
