//! Health checking for the outbounds of a multi-outbound proxy router.
//!
//! Periodically probes every outbound, keeps a windowed latency history per
//! outbound and tells a dead network apart from dead outbounds.

pub mod admin;
pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod outbound;
pub mod resilience;

pub use config::AppConfig;
pub use health::HealthCheck;
pub use lifecycle::Shutdown;
