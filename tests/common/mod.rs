//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use inference_gateway::config::{ConfigStore, GatewayConfig};
use inference_gateway::load_balancer::ServerPool;
use inference_gateway::security::SlidingWindowLimiter;
use inference_gateway::{GatewayServer, Shutdown};

pub const TEST_KEY: &str = "test-key";
pub const HEALTH_PATH: &str = "/health";

/// A mock backend listening on an ephemeral port.
#[allow(dead_code)]
pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of requests received whose path starts with `prefix`.
    pub fn requests_to(&self, prefix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|head| request_path(head).starts_with(prefix))
            .count()
    }

    /// Requests received other than health probes.
    pub fn proxied(&self) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|head| !request_path(head).starts_with(HEALTH_PATH))
            .count()
    }
}

/// Path from the request line of a raw request head.
pub fn request_path(head: &str) -> &str {
    head.lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("")
}

/// Start a backend that answers every request with 200 and a fixed body.
#[allow(dead_code)]
pub async fn start_mock_backend(response: &'static str) -> MockBackend {
    start_programmable_backend(move |_head| async move { (200, response.to_string()) }).await
}

/// Start a backend whose response is computed from the raw request head.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockBackend
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let seen = requests.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let f = f.clone();
            let seen = seen.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                seen.lock().unwrap().push(head.clone());

                let (status, body) = f(head).await;
                let reason = StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown");
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    MockBackend { addr, requests }
}

/// Start a backend that accepts connections and never answers.
#[allow(dead_code)]
pub async fn start_hung_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Configuration with one accepted key and fast health checks.
#[allow(dead_code)]
pub fn test_config(backends: Vec<String>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.backends = backends;
    config.auth.api_keys = vec![TEST_KEY.to_string()];
    config.health_check.path = HEALTH_PATH.to_string();
    config.health_check.interval_secs = 1;
    config.health_check.timeout_ms = 500;
    config
}

/// A gateway running on an ephemeral port.
#[allow(dead_code)]
pub struct TestGateway {
    pub addr: SocketAddr,
    pub store: Arc<ConfigStore>,
    pub pool: Arc<ServerPool>,
    pub limiter: Arc<SlidingWindowLimiter>,
    pub shutdown: Shutdown,
    pub task: JoinHandle<std::io::Result<()>>,
}

#[allow(dead_code)]
impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Exposition lines of the metric `name` that carry every label in `labels`.
    pub async fn metric_lines(&self, name: &str, labels: &[&str]) -> Vec<String> {
        let body = client()
            .get(self.url("/metrics"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        let prefix = format!("{}{{", name);
        body.lines()
            .filter(|line| line.starts_with(&prefix) && labels.iter().all(|l| line.contains(l)))
            .map(str::to_string)
            .collect()
    }

    /// Wait until the pool reports `count` healthy backends.
    pub async fn wait_for_healthy(&self, count: usize) {
        let pool = self.pool.clone();
        wait_until(Duration::from_secs(5), move || pool.healthy_count() == count).await;
    }
}

/// Start a gateway serving `store`.
#[allow(dead_code)]
pub async fn spawn_gateway(store: Arc<ConfigStore>) -> TestGateway {
    let server = GatewayServer::new(store.clone());
    let pool = server.pool();
    let limiter = server.rate_limiter();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestGateway {
        addr,
        store,
        pool,
        limiter,
        shutdown,
        task,
    }
}

/// Poll `condition` every 20ms, panicking after `timeout`.
#[allow(dead_code)]
pub async fn wait_until<F>(timeout: Duration, condition: F)
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "condition not met within {:?}", timeout);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
