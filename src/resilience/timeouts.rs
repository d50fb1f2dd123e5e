//! Timeout enforcement.
//!
//! # Responsibilities
//! - Define the deadline shared by probes and connectivity checks
//! - Wrap probe futures so an overrun becomes a failure, not a hang
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other probe errors

use std::future::Future;
use std::time::Duration;
use tokio::time;

use crate::health::error::ProbeError;

/// Deadline of every network operation issued by the health checker.
pub const TCP_TIMEOUT: Duration = Duration::from_secs(5);

/// Run `fut`, failing with `ProbeError::Timeout` once `deadline` passes.
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, ProbeError>
where
    F: Future<Output = Result<T, ProbeError>>,
{
    match time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout(deadline.as_millis() as u64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_passes_result_through() {
        let result =
            with_deadline(Duration::from_secs(1), async { Ok::<_, ProbeError>(7u16) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_overrun_is_timeout() {
        let result = with_deadline(Duration::from_millis(100), async {
            time::sleep(Duration::from_secs(10)).await;
            Ok::<_, ProbeError>(1u16)
        })
        .await;
        assert!(matches!(result, Err(ProbeError::Timeout(100))));
    }
}
