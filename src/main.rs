//! ==============================================================================
//! main.rs - greenpulse host entry point
//! ==============================================================================
//!
//! purpose:
//!     backend for the greenpulse bioreactor benches. a station posts its
//!     environmental readings here; clients read them back, and selected
//!     readings are forwarded to a chat-completion api for analysis,
//!     growth predictions and conversational answers.
//!
//! responsibilities:
//!     - load host.toml (or defaults) and apply env overrides
//!     - initialize logging
//!     - create the sensor store and the ai gateway (composition root)
//!     - serve the json api and the pre-built front-end
//!
//! relationships:
//!     - config.rs    (HostConfig)
//!     - store.rs     (SensorStore: current reading + history)
//!     - gateway.rs   (AiGateway: chat-completion client)
//!     - api.rs       (router + handlers)
//!     - frontend.rs  (static assets, spa fallback)
//!
//! architecture:
//!
//!     ┌──────────────┐   POST /api/sensor-data    ┌─────────────────────────┐
//!     │ station      │ ─────────────────────────► │ api.rs                  │
//!     └──────────────┘                            │   ├─ store.rs (rwlock)  │
//!     ┌──────────────┐   GET / POST /api/*        │   ├─ prompts.rs         │
//!     │ web client   │ ◄────────────────────────► │   └─ gateway.rs ──────┐ │
//!     └──────────────┘                            └───────────────────────┼─┘
//!                                                                         ▼
//!                                                        chat-completion endpoint
//!
//! ==============================================================================

mod api;
mod config;
mod domain;
mod error;
mod frontend;
mod gateway;
mod prompts;
mod store;

use anyhow::{Context, Result};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // startup banner
    println!("===========================================================");
    println!("  GreenPulse Host");
    println!("  Bioreactor telemetry + AI analysis");
    println!("===========================================================");

    // step 1: load configuration
    let mut config = config::HostConfig::load_or_default();
    config.apply_env_overrides();
    config.print_summary();

    // step 2: logging (RUST_LOG wins over the config level)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // step 3: shared state
    let store = store::SensorStore::new(config.sensors.fallback.clone());
    let gateway = gateway::AiGateway::from_config(&config.ai);
    if !gateway.is_available() {
        tracing::warn!("[STARTUP] AI endpoints will answer with an error until a key is configured");
    }

    let state = api::AppState {
        store,
        gateway,
        dist_dir: Arc::new(config.frontend.dist_dir.clone()),
        show_sensor_data: config.logging.show_sensor_data,
    };

    // step 4: web server
    let mut app = api::router(state);
    if config.server.cors_permissive {
        app = app.layer(CorsLayer::permissive());
    }

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    tracing::info!("[STARTUP] ✓ API live at http://{}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("[SHUTDOWN] server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[SHUTDOWN] failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("[SHUTDOWN] ctrl-c received, draining requests");
}
