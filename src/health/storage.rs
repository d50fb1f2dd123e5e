//! Fixed-capacity latency history for a single outbound.
//!
//! # Layout
//! ```text
//! slots:  [ s3 | s4 | s0 | s1 | s2 ]
//!                ^ cursor (latest)
//! get(0) = s4, get(1) = s3, get(2) = s2 ...
//! ```
//!
//! # Design Decisions
//! - Slots are `Option` so never-written entries read as absent
//! - Every write drops the cached statistics (see `stats.rs`)
//! - The store itself is not synchronized; owners wrap it in a lock

use serde::Serialize;
use std::time::{Duration, Instant};

use crate::health::stats::Stats;

/// Round-trip time of one probe, or the marker of a probe that did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Rtt {
    /// Measured latency in milliseconds.
    Millis(u16),
    /// The probe failed.
    Failed,
}

impl Rtt {
    pub fn is_failed(&self) -> bool {
        matches!(self, Rtt::Failed)
    }

    /// Latency in milliseconds, `None` for failures.
    pub fn millis(&self) -> Option<u16> {
        match self {
            Rtt::Millis(ms) => Some(*ms),
            Rtt::Failed => None,
        }
    }
}

/// A timestamped latency sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub time: Instant,
    pub delay: Rtt,
}

/// Ring buffer of the most recent samples of one outbound.
#[derive(Debug)]
pub struct LatencyStore {
    cursor: usize,
    validity: Duration,
    slots: Vec<Option<Sample>>,
    pub(crate) cached: Option<Stats>,
}

impl LatencyStore {
    /// Create a store holding `capacity` samples, each counted in statistics
    /// for `validity` after it was taken.
    pub fn new(capacity: usize, validity: Duration) -> Self {
        Self {
            cursor: 0,
            validity,
            slots: vec![None; capacity.max(1)],
            cached: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Record a sample taken now.
    pub fn put(&mut self, delay: Rtt) {
        self.put_at(delay, Instant::now());
    }

    /// Record a sample taken at `time`, overwriting the oldest slot.
    pub fn put_at(&mut self, delay: Rtt, time: Instant) {
        self.cursor = self.index(1);
        self.slots[self.cursor] = Some(Sample { time, delay });
        self.cached = None;
    }

    /// The sample `offset` writes before the latest one, ignoring validity.
    pub fn get(&self, offset: usize) -> Option<Sample> {
        let offset = (offset % self.capacity()) as isize;
        self.slots[self.index(-offset)]
    }

    /// The latest sample, alias of `get(0)`.
    pub fn latest(&self) -> Option<Sample> {
        self.get(0)
    }

    /// All samples from latest to oldest, ignoring validity.
    pub fn all(&self) -> Vec<Sample> {
        (0..self.capacity())
            .map_while(|i| self.get(i))
            .collect()
    }

    fn index(&self, offset: isize) -> usize {
        let cap = self.slots.len() as isize;
        (((self.cursor as isize + offset) % cap + cap) % cap) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store() {
        let store = LatencyStore::new(3, Duration::from_secs(60));
        assert!(store.latest().is_none());
        assert!(store.get(1).is_none());
        assert!(store.all().is_empty());
    }

    #[test]
    fn test_get_by_offset() {
        let mut store = LatencyStore::new(3, Duration::from_secs(60));
        store.put(Rtt::Millis(10));
        store.put(Rtt::Millis(20));

        assert_eq!(store.get(0).unwrap().delay, Rtt::Millis(20));
        assert_eq!(store.get(1).unwrap().delay, Rtt::Millis(10));
        // only two writes so far, the third slot was never written
        assert!(store.get(2).is_none());
        assert_eq!(store.get(0), store.latest());
    }

    #[test]
    fn test_large_offsets_wrap() {
        let mut store = LatencyStore::new(3, Duration::from_secs(60));
        store.put(Rtt::Millis(10));
        store.put(Rtt::Millis(20));

        assert_eq!(store.get(4).unwrap().delay, Rtt::Millis(10));
        // 2^63 % 3 == 2, usize::MAX % 3 == 0
        assert!(store.get(1usize << 63).is_none());
        assert_eq!(store.get(usize::MAX), store.latest());
    }

    #[test]
    fn test_wraps_around_capacity() {
        let mut store = LatencyStore::new(3, Duration::from_secs(60));
        for ms in 1..=7 {
            store.put(Rtt::Millis(ms));
            assert_eq!(store.get(0), store.latest());
        }

        let delays: Vec<_> = store.all().iter().map(|s| s.delay).collect();
        assert_eq!(delays, vec![Rtt::Millis(7), Rtt::Millis(6), Rtt::Millis(5)]);
        // offsets wrap modulo capacity
        assert_eq!(store.get(3), store.get(0));
    }

    #[test]
    fn test_all_stops_at_unwritten_slot() {
        let mut store = LatencyStore::new(5, Duration::from_secs(60));
        store.put(Rtt::Millis(1));
        store.put(Rtt::Failed);

        let all = store.all();
        assert_eq!(all.len(), 2);
        assert!(all[0].delay.is_failed());
        assert_eq!(all[1].delay.millis(), Some(1));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut store = LatencyStore::new(0, Duration::from_secs(1));
        store.put(Rtt::Millis(3));
        assert_eq!(store.capacity(), 1);
        assert_eq!(store.latest().unwrap().delay, Rtt::Millis(3));
    }
}
