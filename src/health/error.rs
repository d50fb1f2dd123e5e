//! Health check error definitions.

use thiserror::Error;

/// Errors returned by a single URL test through an outbound.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The probe did not complete before its deadline.
    #[error("probe timed out after {0} ms")]
    Timeout(u64),

    /// The request could not be built or sent.
    #[error("request failed: {0}")]
    Request(String),

    /// The destination answered with a status that does not count as success.
    #[error("unexpected status {0}")]
    Status(u16),

    /// The outbound cannot carry a URL test (e.g. an unresolved group).
    #[error("outbound {0} cannot be tested directly")]
    UnsupportedOutbound(String),
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        ProbeError::Request(err.to_string())
    }
}

/// Errors surfaced by the health checker.
#[derive(Debug, Error)]
pub enum HealthError {
    /// No provider (or router) knows an outbound with this tag.
    #[error("outbound not found: {0}")]
    OutboundNotFound(String),

    /// Following group selections did not reach a concrete outbound.
    #[error("too deep or loop nesting of outbound groups")]
    TooDeepNesting,

    /// The probe failed and the connectivity check failed as well.
    #[error("no network")]
    NoNetwork,

    /// The probe failed while the network is known to be reachable.
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

/// Result type for health check operations.
pub type HealthResult<T> = Result<T, HealthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HealthError::OutboundNotFound("proxy-a".into());
        assert_eq!(err.to_string(), "outbound not found: proxy-a");

        assert_eq!(
            HealthError::TooDeepNesting.to_string(),
            "too deep or loop nesting of outbound groups"
        );
        assert_eq!(HealthError::NoNetwork.to_string(), "no network");

        let err: HealthError = ProbeError::Status(503).into();
        assert_eq!(err.to_string(), "unexpected status 503");
    }
}
