//! Configuration file watcher for hot reload.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::store::ConfigStore;

/// A watcher that reloads the [`ConfigStore`] whenever its file changes.
pub struct ConfigWatcher {
    path: PathBuf,
    store: Arc<ConfigStore>,
}

impl ConfigWatcher {
    /// Create a watcher for a file-backed store.
    ///
    /// Returns `None` for in-memory stores.
    pub fn new(store: Arc<ConfigStore>) -> Option<Self> {
        let path = store.path()?.to_path_buf();
        Some(Self { path, store })
    }

    /// Start watching the file in a background thread.
    ///
    /// The parent directory is watched so that atomic replacements (write to
    /// a temporary file, then rename) are seen. Watching stops when the
    /// returned watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let store = self.store.clone();
        let target = self.path.file_name().map(|name| name.to_os_string());

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let touches_config = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == target);
                    if touches_config && (event.kind.is_modify() || event.kind.is_create()) {
                        tracing::info!("Config file change detected, reloading...");
                        match store.reload() {
                            Ok(config) => {
                                tracing::info!(backends = config.backends.len(), "Config reloaded from watcher");
                            }
                            Err(e) => {
                                tracing::error!("Failed to reload config: {}. Keeping current configuration.", e);
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
