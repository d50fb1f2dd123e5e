//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer / on-demand call (checker.rs)
//!     → resolve group outbounds (outbound::resolver)
//!     → dedupe per round, disambiguate network outages (context.rs)
//!     → URL test with deadline (outbound::tester)
//!     → registry.rs → storage.rs (ring buffer per outbound)
//!     → history.rs (shared last-result sink, optional)
//!
//! Readers:
//!     stats.rs (windowed statistics, cached until the oldest sample expires)
//!     report.rs (serializable views for the admin API and CLI)
//! ```
//!
//! # Design Decisions
//! - A dead network is never recorded as dead outbounds
//! - History is a time window bounded by a sample count, not a pure count
//! - Each store has its own lock; there is no subsystem-wide lock

pub mod checker;
pub mod context;
pub mod error;
pub mod history;
pub mod registry;
pub mod report;
pub mod stats;
pub mod storage;

pub use checker::HealthCheck;
pub use context::ProbeContext;
pub use error::{HealthError, HealthResult, ProbeError};
pub use history::{History, HistorySink, MemoryHistory};
pub use registry::StorageRegistry;
pub use stats::Stats;
pub use storage::{LatencyStore, Rtt, Sample};
