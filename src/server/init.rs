//! Server initialization and main run loop
//!
//! Contains the main `run()` function that starts all components.

use super::background_tasks::{seed_jobs, start_scheduler};
use super::init_stores::init_backends;
use super::loader::load_config;
use super::validation::validate_config;
use anyhow::{Context, Result};
use cronmesh_core::{shutdown::shutdown_signal_with_controller, JobService, ShutdownController};
use std::net::SocketAddr;
use tracing::{info, warn};

/// What this process runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// HTTP API and scheduler
    Serve,
    /// Scheduler only
    Worker,
}

/// Run the server
pub async fn run(mode: RunMode) -> Result<()> {
    let config = load_config()?;
    validate_config(&config)?;

    let backends = init_backends(&config).await?;
    let service = JobService::new(backends.store.clone());
    seed_jobs(&service, &config.seed).await;

    let shutdown_controller = ShutdownController::new();

    let scheduler = start_scheduler(
        &config,
        backends.store.clone(),
        backends.locks.clone(),
        &shutdown_controller,
    );
    let engine = scheduler.as_ref().map(|(engine, _)| engine.clone());

    match mode {
        RunMode::Worker => {
            if scheduler.is_none() {
                warn!("Worker started with the scheduler disabled; nothing to do");
            }
            info!("Worker running, waiting for shutdown signal");
            shutdown_signal_with_controller(shutdown_controller.clone()).await;
        }
        RunMode::Serve => {
            let app = crate::api::app(service, backends.locks.clone(), engine);

            let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
                .parse()
                .context("Invalid server address")?;
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .context("Failed to bind to address")?;
            info!("HTTP server listening on http://{}", addr);

            let server_guard = shutdown_controller.track();
            let server_token = shutdown_controller.token();
            let mut server = tokio::spawn(async move {
                let result = axum::serve(listener, app)
                    .with_graceful_shutdown(async move { server_token.cancelled().await })
                    .await;
                drop(server_guard);
                result
            });

            tokio::select! {
                joined = &mut server => {
                    // Server stopped on its own; stop the scheduler too
                    shutdown_controller.shutdown().await;
                    joined
                        .context("HTTP server task panicked")?
                        .context("HTTP server error")?;
                }
                _ = shutdown_signal_with_controller(shutdown_controller.clone()) => {
                    if server.is_finished() {
                        server
                            .await
                            .context("HTTP server task panicked")?
                            .context("HTTP server error")?;
                    } else {
                        warn!("HTTP server did not drain in time, aborting");
                        server.abort();
                    }
                }
            }
        }
    }

    info!("Cronmesh shutdown complete");
    Ok(())
}
