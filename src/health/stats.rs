//! Rolling latency statistics with a self-expiring cache.
//!
//! # Algorithm
//! ```text
//! latest → oldest
//!     stop at the first sample older than `validity`
//!     Failed  → fail += 1
//!     Millis  → sum, min, max, deviation input
//! cache until the oldest included sample leaves the window
//! ```
//!
//! # Design Decisions
//! - Expiry is checked lazily on the next query rather than by a timer
//! - A single successful sample reports half its latency as deviation, so
//!   outbounds probed once do not look perfectly stable

use std::time::Instant;

use crate::health::storage::{LatencyStore, Rtt};

/// Statistics of the samples currently inside the validity window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    /// Number of samples in the window.
    pub all: usize,
    /// Number of failed samples in the window.
    pub fail: usize,
    /// Standard deviation of successful RTTs (ms).
    pub deviation: u16,
    /// Average of successful RTTs (ms).
    pub average: u16,
    /// Maximum successful RTT (ms).
    pub max: u16,
    /// Minimum successful RTT (ms).
    pub min: u16,
    /// Latest sample, if it is still inside the window.
    pub latest: Option<Rtt>,
    /// When these statistics stop being valid.
    pub expires: Option<Instant>,
}

impl LatencyStore {
    /// Statistics as of now, served from cache while it is still valid.
    pub fn stats(&mut self) -> Stats {
        self.stats_at(Instant::now())
    }

    /// Statistics as of `now`.
    pub fn stats_at(&mut self, now: Instant) -> Stats {
        if let Some(cached) = &self.cached {
            if cached.expires.is_some_and(|expires| now < expires) {
                return cached.clone();
            }
        }
        let stats = self.compute_stats(now);
        self.cached = stats.expires.map(|_| stats.clone());
        stats
    }

    fn compute_stats(&self, now: Instant) -> Stats {
        let mut stats = Stats::default();
        let mut min = u16::MAX;
        let mut sum: u64 = 0;
        let mut rtts = Vec::with_capacity(self.capacity());

        for i in 0..self.capacity() {
            let Some(sample) = self.get(i) else {
                break;
            };
            let expires_at = sample.time + self.validity();
            if expires_at < now {
                // older samples are out of the window as well
                break;
            }
            if i == 0 {
                stats.latest = Some(sample.delay);
            }
            stats.expires = Some(expires_at);

            match sample.delay {
                Rtt::Failed => stats.fail += 1,
                Rtt::Millis(ms) => {
                    sum += u64::from(ms);
                    rtts.push(ms);
                    stats.max = stats.max.max(ms);
                    min = min.min(ms);
                }
            }
        }

        let count = rtts.len();
        stats.all = count + stats.fail;
        if count > 0 {
            stats.average = (sum / count as u64) as u16;
        }
        if stats.all == 0 || stats.fail == stats.all {
            return stats;
        }
        stats.min = min;

        let deviation = if count < 2 {
            f64::from(stats.average / 2)
        } else {
            let average = f64::from(stats.average);
            let variance = rtts
                .iter()
                .map(|&rtt| (f64::from(rtt) - average).powi(2))
                .sum::<f64>()
                / count as f64;
            variance.sqrt()
        };
        stats.deviation = deviation as u16;
        stats
    }
}
