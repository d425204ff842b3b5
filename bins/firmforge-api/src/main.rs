mod compiler;
mod diagnostics;
mod handlers;
mod metrics;
mod routes;
mod toolchain;
mod workspace;


use anyhow::Context;
use axum::Router;
use firmforge_common::boards::BoardRegistry;
use firmforge_common::config::ServiceConfig;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Semaphore;
use tracing::{info, warn};

pub struct AppState {
    pub boards: BoardRegistry,
    pub config: ServiceConfig,
    /// Bounds the number of simultaneously running toolchain subprocesses.
    pub compile_gate: Semaphore,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("firmforge API booting...");

    let config = ServiceConfig::from_env();
    let boards = BoardRegistry::builtin();

    info!(
        boards = boards.len(),
        toolchain = %config.toolchain_path.display(),
        scratch = %config.scratch_root.display(),
        timeout_secs = config.compile_timeout.as_secs(),
        max_concurrent = config.max_concurrent_compiles,
        "Configuration loaded"
    );

    tokio::fs::create_dir_all(&config.scratch_root)
        .await
        .with_context(|| {
            format!(
                "failed to create scratch root {}",
                config.scratch_root.display()
            )
        })?;

    if !config.toolchain_path.exists() {
        warn!(
            path = %config.toolchain_path.display(),
            "Toolchain binary not found; compile requests will fail until it is installed"
        );
    }

    let addr = config.bind_addr.clone();
    let state = Arc::new(AppState {
        compile_gate: Semaphore::new(config.max_concurrent_compiles),
        boards,
        config,
    });

    // Build router
    let app = Router::new().merge(routes::routes()).with_state(state);

    // Start server
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);
    info!("Ready to accept compile jobs");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    warn!("Received shutdown signal, finishing in-flight jobs...");
}
