//! Serializable views of latency history for reporting consumers.

use serde::Serialize;
use std::time::Instant;

use crate::health::registry::{lock, StorageRegistry};
use crate::health::stats::Stats;
use crate::health::storage::Rtt;

/// Statistics of one outbound as shown to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundReport {
    pub tag: String,
    pub all: usize,
    pub fail: usize,
    pub average: u16,
    pub deviation: u16,
    pub min: u16,
    pub max: u16,
    /// Latest latency in ms, `null` if the latest probe failed.
    pub latest: Option<Rtt>,
}

impl OutboundReport {
    pub fn new(tag: &str, stats: &Stats) -> Self {
        Self {
            tag: tag.to_string(),
            all: stats.all,
            fail: stats.fail,
            average: stats.average,
            deviation: stats.deviation,
            min: stats.min,
            max: stats.max,
            latest: stats.latest,
        }
    }
}

/// One stored sample with its age.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleReport {
    pub age_ms: u64,
    pub delay: Rtt,
}

/// Statistics plus raw samples (latest first) of one outbound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundDetail {
    #[serde(flatten)]
    pub stats: OutboundReport,
    pub samples: Vec<SampleReport>,
}

impl StorageRegistry {
    /// Reports of every known outbound, sorted by tag.
    pub fn report(&self) -> Vec<OutboundReport> {
        let mut tags = self.list();
        tags.sort();
        tags.iter()
            .map(|tag| OutboundReport::new(tag, &self.stats(tag)))
            .collect()
    }

    /// Detailed report of `tag`, `None` if nothing was recorded for it.
    pub fn detail(&self, tag: &str) -> Option<OutboundDetail> {
        let store = self.get(tag)?;
        let mut store = lock(&store);
        let now = Instant::now();
        let samples = store
            .all()
            .into_iter()
            .map(|s| SampleReport {
                age_ms: now.saturating_duration_since(s.time).as_millis() as u64,
                delay: s.delay,
            })
            .collect();
        let stats = OutboundReport::new(tag, &store.stats_at(now));
        Some(OutboundDetail { stats, samples })
    }
}
