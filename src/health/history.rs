//! Cross-checker latency history for UI display.
//!
//! Every checker keeps its own [`StorageRegistry`](crate::health::registry::StorageRegistry)
//! since destinations and sampling differ between checkers; the sink only
//! mirrors the last result per outbound so a UI can show it.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::SystemTime;

/// Last probe result of an outbound. A `delay` of 0 marks a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct History {
    pub time: SystemTime,
    pub delay: u16,
}

/// Destination of probe results shared across checkers.
pub trait HistorySink: Send + Sync {
    fn store(&self, tag: &str, history: History);
}

/// In-memory `HistorySink` keeping the latest result per tag.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    inner: Arc<DashMap<String, History>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, tag: &str) -> Option<History> {
        self.inner.get(tag).map(|r| *r.value())
    }

    pub fn delete(&self, tag: &str) {
        self.inner.remove(tag);
    }

    /// Copy of every stored entry.
    pub fn snapshot(&self) -> Vec<(String, History)> {
        self.inner
            .iter()
            .map(|r| (r.key().clone(), *r.value()))
            .collect()
    }
}

impl HistorySink for MemoryHistory {
    fn store(&self, tag: &str, history: History) {
        self.inner.insert(tag.to_string(), history);
    }
}
