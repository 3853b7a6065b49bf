//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP)
//! - Translate signals to internal events
//! - Trigger appropriate actions (shutdown, reload)
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A second SIGTERM/SIGINT during shutdown exits immediately
//! - SIGHUP triggers config reload, not shutdown

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::ConfigStore;
use crate::lifecycle::Shutdown;

/// Exit status for a forced shutdown (128 + SIGINT).
const FORCED_EXIT_CODE: i32 = 130;

/// Listen for OS signals until the process exits.
#[cfg(unix)]
pub fn spawn_signal_handler(
    shutdown: Shutdown,
    store: Arc<ConfigStore>,
) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;

    Ok(tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                _ = interrupt.recv() => "SIGINT",
                _ = terminate.recv() => "SIGTERM",
                _ = hangup.recv() => {
                    reload(store.clone()).await;
                    continue;
                }
            };
            request_shutdown(&shutdown, name);
        }
    }))
}

/// Listen for Ctrl+C until the process exits.
#[cfg(not(unix))]
pub fn spawn_signal_handler(
    shutdown: Shutdown,
    _store: Arc<ConfigStore>,
) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                return;
            }
            request_shutdown(&shutdown, "Ctrl+C");
        }
    }))
}

fn request_shutdown(shutdown: &Shutdown, signal: &str) {
    if shutdown.is_triggered() {
        tracing::warn!(signal, "Second shutdown signal received, exiting immediately");
        std::process::exit(FORCED_EXIT_CODE);
    }
    tracing::info!(signal, "Shutdown signal received, draining connections");
    shutdown.trigger();
}

#[cfg(unix)]
async fn reload(store: Arc<ConfigStore>) {
    tracing::info!("SIGHUP received, reloading configuration");
    match tokio::task::spawn_blocking(move || store.reload()).await {
        Ok(Ok(config)) => tracing::info!(backends = config.backends.len(), "Config reloaded"),
        Ok(Err(e)) => tracing::error!(error = %e, "Failed to reload config. Keeping current configuration."),
        Err(e) => tracing::error!(error = %e, "Config reload task failed"),
    }
}
