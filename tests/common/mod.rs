//! Shared utilities for integration tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use outbound_health::config::HealthCheckConfig;
use outbound_health::health::{HealthCheck, ProbeError};
use outbound_health::outbound::{Outbound, OutboundProvider, StaticRouter, UrlTester};

/// Start an HTTP backend answering `204 No Content` to every request.
///
/// Returns its address and the number of requests served so far.
#[allow(dead_code)]
pub async fn start_counting_backend() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let counter = counter.clone();
            tokio::spawn(async move {
                // read the request head before answering so closing never resets it
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                    if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = socket
                    .write_all(b"HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n")
                    .await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, hits)
}

/// Scripted `UrlTester`: tags listed in `latencies` succeed, all others fail.
#[derive(Default)]
pub struct MockTester {
    latencies: HashMap<String, u16>,
    success_delay: Duration,
    failure_delay: Duration,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[allow(dead_code)]
impl MockTester {
    pub fn new(latencies: &[(&str, u16)]) -> Self {
        Self {
            latencies: latencies
                .iter()
                .map(|(tag, ms)| (tag.to_string(), *ms))
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_success_delay(mut self, delay: Duration) -> Self {
        self.success_delay = delay;
        self
    }

    pub fn with_failure_delay(mut self, delay: Duration) -> Self {
        self.failure_delay = delay;
        self
    }

    pub fn calls(&self, tag: &str) -> usize {
        self.calls.lock().unwrap().get(tag).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UrlTester for MockTester {
    async fn test(&self, _destination: &str, outbound: &Outbound) -> Result<u16, ProbeError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(outbound.tag().to_string())
            .or_default() += 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = self.latencies.get(outbound.tag()).copied();
        let delay = if result.is_some() {
            self.success_delay
        } else {
            self.failure_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result.ok_or_else(|| ProbeError::Request("connection refused".into()))
    }
}

/// Options with a reachable-by-default network.
#[allow(dead_code)]
pub fn options(connectivity: &str) -> HealthCheckConfig {
    HealthCheckConfig {
        connectivity: connectivity.to_string(),
        ..HealthCheckConfig::default()
    }
}

/// Build a checker over `providers`, with `outbounds` also in the router's flat set.
#[allow(dead_code)]
pub fn health_check(
    outbounds: Vec<Arc<Outbound>>,
    providers: Vec<Arc<dyn OutboundProvider>>,
    options: HealthCheckConfig,
    tester: Arc<MockTester>,
) -> HealthCheck {
    let router = Arc::new(StaticRouter::new(outbounds, providers.clone()));
    HealthCheck::new(router, providers, options, tester)
}
