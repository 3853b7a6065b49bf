//! Gate composition.
//!
//! A [`MiddlewarePipeline`] wraps a terminal handler in an ordered list of
//! [`Gate`]s. Wrapping happens in registration order, so the first gate
//! registered ends up innermost and the last one outermost:
//!
//! ```text
//! gates = [rate_limit, identity, observability]
//!
//! request → observability → identity → rate_limit → terminal
//!                 ▲                                    │
//!                 └──────────── response ◀─────────────┘
//! ```
//!
//! A gate either calls [`Next::run`] or answers the request itself. Outer
//! gates see the response of everything inside them, including rejections.

pub mod identity;
pub mod observability;
pub mod rate_limit;

use std::future::Future;
use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response};
use futures_util::future::BoxFuture;

pub use identity::IdentityGate;
pub use observability::ObservabilityGate;
pub use rate_limit::RateLimitGate;

/// Boxed future resolving to a response.
pub type ResponseFuture = BoxFuture<'static, Response>;

/// A type-erased request handler.
pub type BoxHandler = Arc<dyn Fn(Request<Body>) -> ResponseFuture + Send + Sync>;

/// Box an async function as a [`BoxHandler`].
pub fn handler_fn<F, Fut>(f: F) -> BoxHandler
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |request| Box::pin(f(request)))
}

/// The remainder of the chain, handed to a gate.
pub struct Next {
    inner: BoxHandler,
}

impl Next {
    /// Pass the request on to the next gate or the terminal handler.
    pub async fn run(self, request: Request<Body>) -> Response {
        (self.inner)(request).await
    }
}

/// A request-processing unit that may admit, reject or observe.
pub trait Gate: Send + Sync + 'static {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Handle one request.
    fn call(&self, request: Request<Body>, next: Next) -> ResponseFuture;
}

/// Ordered list of gates applied around terminal handlers.
#[derive(Clone, Default)]
pub struct MiddlewarePipeline {
    gates: Vec<Arc<dyn Gate>>,
}

impl MiddlewarePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gate. Later gates wrap earlier ones.
    pub fn with<G: Gate>(mut self, gate: G) -> Self {
        self.include(gate);
        self
    }

    pub fn include<G: Gate>(&mut self, gate: G) {
        self.gates.push(Arc::new(gate));
    }

    /// Gate names from innermost to outermost.
    pub fn names(&self) -> Vec<&'static str> {
        self.gates.iter().map(|g| g.name()).collect()
    }

    /// Wrap `terminal` in every registered gate.
    pub fn apply(&self, terminal: BoxHandler) -> BoxHandler {
        self.gates.iter().fold(terminal, |inner, gate| {
            let gate = Arc::clone(gate);
            Arc::new(move |request| {
                gate.call(
                    request,
                    Next {
                        inner: Arc::clone(&inner),
                    },
                )
            })
        })
    }
}
