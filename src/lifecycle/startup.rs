//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize all subsystems in dependency order
//! - Start background tasks (signals, config watcher, metrics upkeep)
//! - Bind listeners and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: an unreadable or invalid config is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::watcher::ConfigWatcher;
use crate::config::ConfigStore;
use crate::error::GatewayError;
use crate::http::GatewayServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::{logging, metrics};

const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Command-line controlled startup settings.
#[derive(Debug, Clone)]
pub struct StartupOptions {
    pub config_path: PathBuf,
    /// Reload the config whenever its file changes.
    pub watch: bool,
}

/// Run the gateway until a shutdown signal arrives.
pub async fn run(options: StartupOptions) -> Result<(), GatewayError> {
    let store = Arc::new(ConfigStore::open(&options.config_path)?);
    let config = store.current();

    if let Some(log_handle) = logging::init_logging(&config.observability) {
        store.on_change(move |config| log_handle.apply(&config.observability));
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %options.config_path.display(),
        backends = config.backends.len(),
        rate_limit = config.rate_limit.enabled,
        metrics = config.observability.metrics_enabled,
        "inference-gateway starting"
    );

    let server = GatewayServer::new(store.clone());
    let shutdown = Shutdown::new();

    let _signals = signals::spawn_signal_handler(shutdown.clone(), store.clone())?;
    let _upkeep = metrics::spawn_upkeep(server.state().metrics.clone(), METRICS_UPKEEP_INTERVAL, shutdown.subscribe());

    // Dropping the watcher stops it, so it lives until the server returns.
    let _watcher = if options.watch {
        ConfigWatcher::new(store.clone()).and_then(|watcher| match watcher.run() {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!(error = %e, "Config watcher unavailable, continuing without it");
                None
            }
        })
    } else {
        None
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
