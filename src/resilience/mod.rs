//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Probe through an outbound:
//!     → timeouts.rs (enforce the probe deadline)
//!     → overrun reported as a probe failure
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - In-flight probes are bounded by time, never forcibly cancelled

pub mod timeouts;
