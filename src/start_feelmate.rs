//! Startup helpers for the `FeelMate` binaries.
//!
//! `run_server` hosts the support API with its expiry worker, `run_client`
//! drives the terminal front end.

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use crate::config::FeelmateConfig;
use crate::server::{self, AppState};
use crate::support::{CleanupConfig, SessionCleanup};
use crate::terminal::TerminalApp;

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn load_config() -> Option<FeelmateConfig> {
    let config = FeelmateConfig::from_env();
    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {e}");
        return None;
    }
    Some(config)
}

fn runtime() -> Option<tokio::runtime::Runtime> {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => Some(rt),
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            None
        }
    }
}

/// Run the support service until Ctrl-C.
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run_server() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(env_filter("info")).init();

    tracing::info!("Starting FeelMate server v{}", env!("CARGO_PKG_VERSION"));

    let Some(config) = load_config() else {
        return ExitCode::from(1);
    };
    let Some(rt) = runtime() else {
        return ExitCode::from(1);
    };

    let result = rt.block_on(async move {
        let state = AppState::new(config.server.clone()).await?;

        let cleanup = SessionCleanup::new(state.support.store(), CleanupConfig::from(&config.server));
        let cleanup_shutdown = cleanup.shutdown_notifier();
        let cleanup_handle = cleanup.spawn();

        let served = server::run_server_with_shutdown(state, shutdown_signal()).await;

        cleanup_shutdown.notify_one();
        if let Err(e) = cleanup_handle.await {
            tracing::warn!("Cleanup worker ended abnormally: {e}");
        }
        served
    });

    if let Err(e) = result {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    tracing::info!("FeelMate server stopped");
    ExitCode::SUCCESS
}

/// Run the terminal client until the user quits.
///
/// Logs go to stderr so they do not interleave with the chat.
#[must_use]
pub fn run_client() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .with_writer(std::io::stderr)
        .init();

    let Some(config) = load_config() else {
        return ExitCode::from(1);
    };
    let Some(rt) = runtime() else {
        return ExitCode::from(1);
    };

    let result = rt.block_on(async move { TerminalApp::new(&config.client)?.run().await });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Client error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        return;
    }
    tracing::info!("Shutdown signal received");
}
