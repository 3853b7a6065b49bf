//! Structured logging.
//!
//! The subscriber is a `tracing-subscriber` registry with an `EnvFilter`
//! behind a reload layer, so a configuration reload can change the level
//! or silence logging entirely. `RUST_LOG`, when set at startup, pins the
//! filter and config changes are ignored.

use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

use crate::config::ObservabilityConfig;

/// Handle for adjusting the log filter at runtime.
#[derive(Clone)]
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    pinned_by_env: bool,
}

impl LogHandle {
    /// Apply the logging settings of a (re)loaded configuration.
    pub fn apply(&self, config: &ObservabilityConfig) {
        if self.pinned_by_env {
            return;
        }
        if let Err(e) = self.filter.reload(filter_for(config)) {
            tracing::warn!(error = %e, "Failed to apply log level");
        }
    }
}

/// Install the global subscriber.
///
/// Returns `None` if a subscriber was already installed (e.g. by a test).
pub fn init_logging(config: &ObservabilityConfig) -> Option<LogHandle> {
    let env_filter = EnvFilter::try_from_default_env().ok();
    let pinned_by_env = env_filter.is_some();
    let filter = env_filter.unwrap_or_else(|| filter_for(config));

    let (filter_layer, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer())
        .try_init()
        .ok()?;

    Some(LogHandle {
        filter: handle,
        pinned_by_env,
    })
}

fn filter_for(config: &ObservabilityConfig) -> EnvFilter {
    if !config.logging {
        return EnvFilter::new("off");
    }
    let directives = format!(
        "warn,inference_gateway={level},tower_http={level}",
        level = config.log_level
    );
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"))
}
