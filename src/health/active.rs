//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend in the pool
//! - Bound the number of probes in flight
//! - Update each backend's health flag from its own probe result

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time;

use crate::config::{ConfigStore, HealthCheckConfig};
use crate::lifecycle::ShutdownSignal;
use crate::load_balancer::{BackendServer, ServerPool};
use crate::observability::metrics;

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Response status in [200, 300).
    Healthy,
    /// The backend answered with a non-2xx status.
    Status(StatusCode),
    /// Connection-level failure.
    Transport(String),
    /// No response within the probe timeout.
    Timeout,
    /// The probe URL could not be built from the address and path.
    InvalidUri(String),
}

impl ProbeOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeOutcome::Healthy)
    }
}

/// Background task that keeps the pool's health flags current.
pub struct HealthProber {
    pool: Arc<ServerPool>,
    config: Arc<ConfigStore>,
    client: Client<HttpConnector, Body>,
}

impl HealthProber {
    pub fn new(pool: Arc<ServerPool>, config: Arc<ConfigStore>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            pool,
            config,
            client,
        }
    }

    /// Probe rounds until shutdown.
    ///
    /// Settings are re-read from the config store at the start of every
    /// round, so a reload takes effect on the next tick. Shutdown during a
    /// round aborts its in-flight probes.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        let initial = self.config.current().health_check.clone();
        tracing::info!(
            interval_secs = initial.interval_secs,
            timeout_ms = initial.timeout_ms,
            concurrency = initial.concurrency,
            path = %initial.path,
            "Health prober starting"
        );

        loop {
            let settings = self.config.current().health_check.clone();

            tokio::select! {
                healthy = self.probe_all(&settings) => {
                    tracing::debug!(healthy, total = self.pool.len(), "Health probe round complete");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health prober received shutdown signal, exiting loop");
                    break;
                }
            }

            tokio::select! {
                _ = time::sleep(settings.interval()) => {}
                _ = shutdown.recv() => {
                    tracing::info!("Health prober received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one probe round over a snapshot of the pool and wait for every
    /// probe to finish. Returns the number of healthy backends.
    ///
    /// At most `settings.concurrency` probes are in flight. Dropping the
    /// returned future aborts outstanding probes.
    pub async fn probe_all(&self, settings: &HealthCheckConfig) -> usize {
        let servers = self.pool.snapshot();
        let semaphore = Arc::new(Semaphore::new(settings.concurrency.max(1)));
        let timeout = settings.timeout();
        let mut probes = JoinSet::new();

        for server in servers {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let client = self.client.clone();
            let path = settings.path.clone();

            probes.spawn(async move {
                let _permit = permit;
                let outcome = probe_backend(&client, server.address(), &path, timeout).await;
                apply_outcome(&server, &outcome);
                outcome.is_healthy()
            });
        }

        let mut healthy = 0;
        while let Some(result) = probes.join_next().await {
            match result {
                Ok(true) => healthy += 1,
                Ok(false) => {}
                Err(e) => tracing::error!(error = %e, "Health probe task failed"),
            }
        }
        healthy
    }
}

/// Issue one GET to `address + path` with its own timeout.
pub async fn probe_backend(
    client: &Client<HttpConnector, Body>,
    address: &str,
    path: &str,
    timeout: Duration,
) -> ProbeOutcome {
    let uri_string = format!("{}{}", address.trim_end_matches('/'), path);
    let uri: Uri = match uri_string.parse() {
        Ok(uri) => uri,
        Err(e) => return ProbeOutcome::InvalidUri(format!("{}: {}", uri_string, e)),
    };

    let request = match Request::builder()
        .method("GET")
        .uri(uri)
        .header("user-agent", "inference-gateway-health-check")
        .body(Body::empty())
    {
        Ok(req) => req,
        Err(e) => return ProbeOutcome::InvalidUri(e.to_string()),
    };

    match time::timeout(timeout, client.request(request)).await {
        Ok(Ok(response)) if response.status().is_success() => ProbeOutcome::Healthy,
        Ok(Ok(response)) => ProbeOutcome::Status(response.status()),
        Ok(Err(e)) => ProbeOutcome::Transport(e.to_string()),
        Err(_) => ProbeOutcome::Timeout,
    }
}

fn apply_outcome(server: &BackendServer, outcome: &ProbeOutcome) {
    let healthy = outcome.is_healthy();
    let was_healthy = server.set_healthy(healthy);

    match outcome {
        ProbeOutcome::Healthy => {}
        ProbeOutcome::Status(status) => {
            tracing::warn!(backend = %server.address(), status = %status, "Health check failed: non-success status");
        }
        ProbeOutcome::Transport(error) => {
            tracing::warn!(backend = %server.address(), error = %error, "Health check failed: connection error");
        }
        ProbeOutcome::Timeout => {
            tracing::warn!(backend = %server.address(), "Health check failed: timeout");
        }
        ProbeOutcome::InvalidUri(error) => {
            tracing::error!(backend = %server.address(), error = %error, "Health check failed: invalid probe URL");
        }
    }

    if was_healthy != healthy {
        tracing::info!(backend = %server.address(), healthy, "Backend health changed");
    }
    metrics::record_backend_health(server.address(), healthy);
}
