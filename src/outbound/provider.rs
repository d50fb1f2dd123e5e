//! Outbound providers.
//!
//! A provider is a named collection of outbounds with its own readiness
//! lifecycle (e.g. a subscription fetched at startup). The checker waits for
//! every provider to be ready before its first round.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

use crate::outbound::Outbound;

/// A named collection of outbounds.
#[async_trait]
pub trait OutboundProvider: Send + Sync {
    fn tag(&self) -> &str;

    /// All outbounds of the provider.
    fn outbounds(&self) -> Vec<Arc<Outbound>>;

    /// Look up an outbound of the provider by tag.
    fn outbound(&self, tag: &str) -> Option<Arc<Outbound>>;

    /// Wait until the provider's outbounds are loaded.
    async fn wait(&self);
}

/// Provider over a fixed outbound list.
#[derive(Debug)]
pub struct StaticProvider {
    tag: String,
    outbounds: Vec<Arc<Outbound>>,
    ready: watch::Sender<bool>,
}

impl StaticProvider {
    /// Create a provider that is not ready until `mark_ready` is called.
    pub fn new(tag: impl Into<String>, outbounds: Vec<Arc<Outbound>>) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            tag: tag.into(),
            outbounds,
            ready,
        }
    }

    /// Create a provider that is ready immediately.
    pub fn ready(tag: impl Into<String>, outbounds: Vec<Arc<Outbound>>) -> Self {
        let provider = Self::new(tag, outbounds);
        provider.mark_ready();
        provider
    }

    /// Release everyone waiting on this provider.
    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }
}

#[async_trait]
impl OutboundProvider for StaticProvider {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn outbounds(&self) -> Vec<Arc<Outbound>> {
        self.outbounds.clone()
    }

    fn outbound(&self, tag: &str) -> Option<Arc<Outbound>> {
        self.outbounds.iter().find(|o| o.tag() == tag).cloned()
    }

    async fn wait(&self) {
        let mut ready = self.ready.subscribe();
        // the sender lives as long as `self`, so this only returns once ready
        let _ = ready.wait_for(|ready| *ready).await;
    }
}
