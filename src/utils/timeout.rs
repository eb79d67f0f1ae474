//! Timeout helpers for socket operations.

use std::future::Future;
use std::time::Duration;

use crate::error::{NetError, Result};

/// Default time allowed to establish a TCP connection
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time a peer gets to complete the challenge/response exchange
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time a stopping server waits for its connections to unwind
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Run `fut`, failing with [`NetError::Timeout`] if it takes longer than `duration`
pub async fn with_timeout_error<F, T>(fut: F, duration: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(NetError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let value = with_timeout_error(async { Ok(5u8) }, Duration::from_secs(1)).await;
        assert!(matches!(value, Ok(5)));
    }

    #[tokio::test]
    async fn test_slow_future_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        };
        let result = with_timeout_error(slow, Duration::from_millis(20)).await;
        assert!(matches!(result, Err(NetError::Timeout)));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: Result<()> =
            with_timeout_error(async { Err(NetError::NotConnected) }, DEFAULT_TIMEOUT).await;
        assert!(matches!(result, Err(NetError::NotConnected)));
    }
}
