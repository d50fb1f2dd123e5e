//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Health checker produces:
//!     → logging.rs (structured log events, one span per check round)
//!     → metrics.rs (probe counters, latency gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
