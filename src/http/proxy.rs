//! Upstream forwarding.
//!
//! # Responsibilities
//! - Pick a healthy backend from the pool (round robin)
//! - Rewrite the request onto the backend's base URL
//! - Stream the request and response bodies without buffering
//! - Bound the wait for response headers with the request deadline
//!
//! # Design Decisions
//! - No retries: inference requests are not assumed idempotent
//! - Hop-by-hop headers are stripped in both directions

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, Uri, Version},
    response::{IntoResponse, Response},
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::error::GatewayError;
use crate::http::request::{client_ip, request_id};
use crate::load_balancer::{BackendServer, ServerPool};
use crate::security::headers::{append_forwarded_for, strip_hop_by_hop};

/// Forwards requests to the backends of a [`ServerPool`].
#[derive(Clone)]
pub struct GatewayHandler {
    pool: Arc<ServerPool>,
    client: Client<HttpConnector, Body>,
}

impl GatewayHandler {
    pub fn new(pool: Arc<ServerPool>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { pool, client }
    }

    /// Select a backend and forward, mapping failures to responses.
    ///
    /// `deadline` bounds the time until the backend's response head
    /// arrives; the body then streams without a limit.
    pub async fn handle(&self, request: Request<Body>, deadline: Duration) -> Response {
        let request_id = request_id(&request).to_string();

        let backend = match self.pool.select_next() {
            Ok(backend) => backend,
            Err(e) => {
                tracing::warn!(request_id = %request_id, "No healthy backends");
                return e.into_response();
            }
        };

        let forwarded = match tokio::time::timeout(deadline, self.forward(&backend, request)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::UpstreamTimeout {
                backend: backend.address().to_string(),
            }),
        };

        match forwarded {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    backend = %backend.address(),
                    error = %e,
                    "Upstream error"
                );
                e.into_response()
            }
        }
    }

    /// Forward one request to `backend` and return its streamed response.
    pub async fn forward(
        &self,
        backend: &BackendServer,
        request: Request<Body>,
    ) -> Result<Response, GatewayError> {
        let upstream_error = |message: String| GatewayError::Upstream {
            backend: backend.address().to_string(),
            message,
        };

        let client = client_ip(&request);
        let (mut parts, body) = request.into_parts();

        parts.uri = upstream_uri(backend.address(), &parts.uri).map_err(upstream_error)?;
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);
        parts.headers.remove(header::HOST);
        if let Some(ip) = client {
            append_forwarded_for(&mut parts.headers, ip.to_canonical());
        }

        tracing::debug!(
            backend = %backend.address(),
            method = %parts.method,
            uri = %parts.uri,
            "Forwarding to backend"
        );

        let response: Response<Incoming> = self
            .client
            .request(Request::from_parts(parts, body))
            .await
            .map_err(|e| upstream_error(e.to_string()))?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Join the backend base URL with the path and query of `original`.
///
/// `http://host:11434/api` + `/v1/chat?x=1` gives
/// `http://host:11434/api/v1/chat?x=1`.
pub fn upstream_uri(base: &str, original: &Uri) -> Result<Uri, String> {
    let path_and_query = original
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let joined = format!("{}{}", base.trim_end_matches('/'), path_and_query);
    joined
        .parse::<Uri>()
        .map_err(|e| format!("invalid upstream uri {}: {}", joined, e))
}
