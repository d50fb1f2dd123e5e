//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure of the health
//! checker. All types derive Serde traits for deserialization from TOML.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Probe settings.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Outbound definitions.
    pub outbounds: Vec<OutboundConfig>,

    /// Provider definitions; empty means one provider holding every outbound.
    pub providers: Vec<ProviderConfig>,
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// URL requested through each outbound to measure latency.
    pub destination: String,

    /// Interval between check rounds in seconds (at least 10).
    pub interval_secs: u64,

    /// Number of samples kept per outbound.
    pub sampling: usize,

    /// URL probed with HEAD to tell a dead network from dead outbounds.
    /// Empty means the network is always considered reachable.
    pub connectivity: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            destination: "http://www.gstatic.com/generate_204".to_string(),
            interval_secs: 60,
            sampling: 10,
            connectivity: String::new(),
        }
    }
}

/// Kind of an outbound definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboundType {
    Direct,
    Proxy,
    Group,
}

/// Outbound definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutboundConfig {
    /// Unique outbound tag.
    pub tag: String,

    #[serde(rename = "type")]
    pub kind: OutboundType,

    /// Proxy URL (`http://`, `https://` or `socks5://`), proxies only.
    #[serde(default)]
    pub url: Option<String>,

    /// Member tags, groups only.
    #[serde(default)]
    pub outbounds: Vec<String>,

    /// Initially selected member, groups only (default: first member).
    #[serde(default)]
    pub selected: Option<String>,
}

/// Provider definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Unique provider tag.
    pub tag: String,

    /// Tags of the outbounds the provider exposes.
    #[serde(default)]
    pub outbounds: Vec<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
