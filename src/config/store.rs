//! Live configuration store.
//!
//! Holds the currently active [`GatewayConfig`] behind an `ArcSwap` so the
//! request path reads it without locking. Reloads and key additions build a
//! complete new value first and publish it only once it is valid; a failed
//! reload leaves the previous configuration in effect.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use arc_swap::ArcSwap;

use crate::config::loader::{load_config, save_config, ConfigError};
use crate::config::schema::GatewayConfig;

type ChangeListener = Box<dyn Fn(&GatewayConfig) + Send + Sync>;

/// Shared, reloadable configuration.
pub struct ConfigStore {
    current: ArcSwap<GatewayConfig>,
    /// Backing file; `None` for in-memory stores.
    path: Option<PathBuf>,
    /// Serializes reload and persist so file writes never interleave.
    write_lock: Mutex<()>,
    listeners: RwLock<Vec<ChangeListener>>,
}

impl ConfigStore {
    /// Load the initial configuration from `path`.
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        let config = load_config(path)?;
        Ok(Self::build(config, Some(path.to_path_buf())))
    }

    /// Create a store that is not backed by a file.
    pub fn in_memory(config: GatewayConfig) -> Self {
        Self::build(config, None)
    }

    fn build(config: GatewayConfig, path: Option<PathBuf>) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
            path,
            write_lock: Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of the active configuration.
    pub fn current(&self) -> Arc<GatewayConfig> {
        self.current.load_full()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Register a callback invoked after every successful publish.
    pub fn on_change<F>(&self, listener: F)
    where
        F: Fn(&GatewayConfig) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    /// Re-read the backing file and publish it.
    ///
    /// In-memory stores re-publish their current value.
    pub fn reload(&self) -> Result<Arc<GatewayConfig>, ConfigError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let config = match &self.path {
            Some(path) => load_config(path)?,
            None => (*self.current()).clone(),
        };
        Ok(self.publish(config))
    }

    /// Add an API key, persist the document, then publish it.
    pub fn add_api_key(&self, key: String) -> Result<Arc<GatewayConfig>, ConfigError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut config = (*self.current()).clone();
        config.auth.api_keys.push(key);

        if let Some(path) = &self.path {
            save_config(path, &config)?;
        }
        Ok(self.publish(config))
    }

    fn publish(&self, config: GatewayConfig) -> Arc<GatewayConfig> {
        let config = Arc::new(config);
        self.current.store(config.clone());

        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener(&config);
        }

        tracing::debug!(
            backends = config.backends.len(),
            api_keys = config.auth.api_keys.len(),
            "Configuration published"
        );
        config
    }
}
