//! Single URL test through an outbound.
//!
//! # Responsibilities
//! - Issue one request to the probe destination through the outbound
//! - Report the round-trip latency in milliseconds
//!
//! # Design Decisions
//! - The checker owns the deadline; testers never retry
//! - One pooled client per proxy URL, built on first use

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Instant;
use url::Url;

use crate::health::error::ProbeError;
use crate::outbound::{Outbound, OutboundKind};
use crate::resilience::timeouts::TCP_TIMEOUT;

/// Probe function injected into the health checker.
#[async_trait]
pub trait UrlTester: Send + Sync {
    /// Measure the latency of `destination` through `outbound`, in ms.
    async fn test(&self, destination: &str, outbound: &Outbound) -> Result<u16, ProbeError>;
}

/// `UrlTester` issuing HTTP GET requests with reqwest.
#[derive(Debug, Default)]
pub struct HttpUrlTester {
    clients: DashMap<String, reqwest::Client>,
}

impl HttpUrlTester {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self, proxy: Option<&Url>) -> Result<reqwest::Client, ProbeError> {
        let key = proxy.map(Url::as_str).unwrap_or("direct");
        if let Some(client) = self.clients.get(key) {
            return Ok(client.value().clone());
        }

        let builder = reqwest::Client::builder()
            .timeout(TCP_TIMEOUT)
            .user_agent(concat!("outbound-health/", env!("CARGO_PKG_VERSION")));
        let builder = match proxy {
            Some(url) => builder.proxy(reqwest::Proxy::all(url.clone())?),
            None => builder.no_proxy(),
        };
        let client = builder.build()?;
        self.clients.insert(key.to_string(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl UrlTester for HttpUrlTester {
    async fn test(&self, destination: &str, outbound: &Outbound) -> Result<u16, ProbeError> {
        let client = match outbound.kind() {
            OutboundKind::Direct => self.client(None)?,
            OutboundKind::Proxy(url) => self.client(Some(url))?,
            OutboundKind::Group(_) => {
                return Err(ProbeError::UnsupportedOutbound(outbound.tag().to_string()))
            }
        };

        let start = Instant::now();
        let response = client.get(destination).send().await?;
        let elapsed = start.elapsed().as_millis();

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            return Err(ProbeError::Status(status.as_u16()));
        }
        Ok(elapsed.clamp(1, u128::from(u16::MAX)) as u16)
    }
}
