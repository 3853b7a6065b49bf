//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the shared components (pool, limiter, forwarder) from the store
//! - Keep them in step with configuration reloads
//! - Create the Axum router: gated proxy and admin routes, open metrics
//! - Wire up tower layers (request ID, tracing)
//! - Run the health prober and limiter sweeper next to the server
//!
//! # Design Decisions
//! - Route paths are fixed at startup; every other setting is re-read per
//!   request or per probe round
//! - The request deadline is applied around forwarding, inside the gates, so
//!   the observability gate records timed-out requests like any other

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin::admin_router;
use crate::config::ConfigStore;
use crate::health::HealthProber;
use crate::http::middleware::{
    handler_fn, BoxHandler, IdentityGate, MiddlewarePipeline, ObservabilityGate, RateLimitGate,
    ResponseFuture,
};
use crate::http::proxy::GatewayHandler;
use crate::http::request::{UuidRequestId, X_REQUEST_ID};
use crate::lifecycle::ShutdownSignal;
use crate::load_balancer::ServerPool;
use crate::observability::metrics;
use crate::security::{SlidingWindowLimiter, WindowPolicy};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigStore>,
    pub pool: Arc<ServerPool>,
    pub limiter: Arc<SlidingWindowLimiter>,
    pub gateway: GatewayHandler,
    pub metrics: PrometheusHandle,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    state: AppState,
    router: Router,
}

impl GatewayServer {
    /// Build every component from the store's current configuration and
    /// subscribe them to later changes.
    pub fn new(config: Arc<ConfigStore>) -> Self {
        let current = config.current();

        let pool = Arc::new(ServerPool::new(current.backends.iter().cloned()));
        let limiter = Arc::new(SlidingWindowLimiter::new(WindowPolicy::from(&current.rate_limit)));
        let metrics_handle = metrics::init_metrics();
        metrics::record_config_totals(current.auth.api_keys.len(), current.backends.len());

        {
            let pool = pool.clone();
            let limiter = limiter.clone();
            config.on_change(move |config| {
                let unchanged = pool
                    .snapshot()
                    .iter()
                    .map(|s| s.address())
                    .eq(config.backends.iter().map(String::as_str));
                if !unchanged {
                    pool.set_servers(config.backends.iter().cloned());
                }
                limiter.set_policy(WindowPolicy::from(&config.rate_limit));
                metrics::record_config_totals(config.auth.api_keys.len(), config.backends.len());
            });
        }

        let state = AppState {
            config: config.clone(),
            pool: pool.clone(),
            limiter,
            gateway: GatewayHandler::new(pool),
            metrics: metrics_handle,
        };

        let router = Self::build_router(state.clone());
        Self { state, router }
    }

    /// Gates in registration order. The first one is innermost.
    pub fn pipeline(state: &AppState) -> MiddlewarePipeline {
        MiddlewarePipeline::new()
            .with(RateLimitGate::new(state.config.clone(), state.limiter.clone()))
            .with(IdentityGate::new(state.config.clone()))
            .with(ObservabilityGate::new(state.config.clone()))
    }

    fn build_router(state: AppState) -> Router {
        let pipeline = Self::pipeline(&state);

        let gateway = state.gateway.clone();
        let config = state.config.clone();
        let proxy = pipeline.apply(handler_fn(move |request: Request<Body>| {
            let gateway = gateway.clone();
            let deadline = Duration::from_secs(config.current().timeouts.request_secs);
            async move { gateway.handle(request, deadline).await }
        }));

        admin_router(state.clone(), &pipeline)
            .fallback(endpoint(proxy))
            .with_state(state)
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn pool(&self) -> Arc<ServerPool> {
        self.state.pool.clone()
    }

    pub fn rate_limiter(&self) -> Arc<SlidingWindowLimiter> {
        self.state.limiter.clone()
    }

    /// The fully layered router, without background tasks.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    ///
    /// The health prober and the limiter sweeper run for as long as the
    /// server does and are joined before returning.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway listening");

        let prober = HealthProber::new(self.state.pool.clone(), self.state.config.clone());
        let prober = tokio::spawn(prober.run(shutdown.clone()));

        let sweep_interval = Duration::from_secs(self.state.config.current().rate_limit.sweep_interval_secs);
        let sweeper = self.state.limiter.spawn_sweeper(sweep_interval, shutdown.clone());

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let mut signal = shutdown.clone();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move { signal.recv().await })
            .await;

        if !shutdown.is_triggered() {
            prober.abort();
            sweeper.abort();
        }
        for task in [prober, sweeper] {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::error!(error = %e, "Background task failed");
                }
            }
        }

        served?;
        tracing::info!("Gateway stopped");
        Ok(())
    }
}

/// Adapt a [`BoxHandler`] for use as an Axum route or fallback.
pub fn endpoint(handler: BoxHandler) -> impl Fn(Request<Body>) -> ResponseFuture + Clone + Send + Sync + 'static {
    move |request| handler(request)
}
