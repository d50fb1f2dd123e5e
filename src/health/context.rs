//! Per-round check context.
//!
//! # Connectivity Disambiguation
//! Checks run concurrently, so successful probes report the network as
//! reachable early and later failures simply read that flag:
//! - any success in the round ⇒ network reachable, no extra request
//! - all probes failed ⇒ dead nodes and a dead network look the same, so one
//!   HEAD request to the connectivity URL decides, once per context
//!
//! The context also records which concrete outbounds were already probed in
//! the round, since several groups may resolve to the same outbound.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;

use crate::resilience::timeouts::TCP_TIMEOUT;

/// Shared state of one check round or one on-demand check.
#[derive(Debug)]
pub struct ProbeContext {
    connectivity_url: Option<String>,
    checked: Mutex<HashSet<String>>,
    connected: AsyncMutex<Option<bool>>,
}

impl ProbeContext {
    /// Create a context; an empty `connectivity_url` means the network is
    /// always considered reachable.
    pub fn new(connectivity_url: &str) -> Self {
        let connectivity_url = Some(connectivity_url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string);
        Self {
            connectivity_url,
            checked: Mutex::new(HashSet::new()),
            connected: AsyncMutex::new(None),
        }
    }

    /// Mark the outbound `tag` as checked in this round.
    pub fn report_checked(&self, tag: &str) {
        self.checked_set().insert(tag.to_string());
    }

    /// Whether the outbound `tag` was checked in this round.
    pub fn checked(&self, tag: &str) -> bool {
        self.checked_set().contains(tag)
    }

    /// Mark `tag` as checked, returning `false` if another probe got there first.
    pub fn claim(&self, tag: &str) -> bool {
        self.checked_set().insert(tag.to_string())
    }

    /// Record that the network is reachable for the rest of the round.
    pub async fn report_connected(&self) {
        *self.connected.lock().await = Some(true);
    }

    /// Whether the network is reachable, checking it at most once.
    pub async fn connected(&self) -> bool {
        let mut connected = self.connected.lock().await;
        if let Some(known) = *connected {
            return known;
        }
        let available = match &self.connectivity_url {
            Some(url) => check_network(url).await,
            None => true,
        };
        *connected = Some(available);
        available
    }

    fn checked_set(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.checked.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn check_network(url: &str) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(TCP_TIMEOUT)
        .no_proxy()
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to build connectivity client");
            return false;
        }
    };
    match client.head(url).send().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Connectivity check failed");
            false
        }
    }
}
