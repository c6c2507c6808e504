//! Timeout helpers
//!
//! Wraps async operations in a wall-clock limit and maps expiry onto
//! [`DocweaveError::Timeout`].
//!
//! ## Usage
//!
//! ```ignore
//! let result = with_timeout(
//!     Duration::from_secs(300),
//!     capability.generate(request),
//!     "generate docs/current-state.md",
//! )
//! .await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::constants::network as net_constants;
use crate::types::{DocweaveError, Result};

/// Timeouts for the operations the engine bounds
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// One generation call (default: 5 minutes)
    pub generation: Duration,
    /// HTTP connection setup (default: 30 seconds)
    pub connection: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            generation: Duration::from_secs(net_constants::DEFAULT_TIMEOUT_SECS),
            connection: Duration::from_secs(net_constants::CONNECTION_TIMEOUT_SECS),
        }
    }
}

impl TimeoutConfig {
    pub fn with_generation_secs(secs: u64) -> Self {
        Self {
            generation: Duration::from_secs(secs),
            ..Self::default()
        }
    }
}

/// Execute an async operation with a timeout
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(DocweaveError::timeout(operation_name, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_config() {
        assert_eq!(TimeoutConfig::default().generation.as_secs(), 300);
        assert_eq!(TimeoutConfig::with_generation_secs(5).generation.as_secs(), 5);
        assert_eq!(TimeoutConfig::with_generation_secs(5).connection.as_secs(), 30);
    }

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(
            Duration::from_secs(1),
            async { Ok::<_, DocweaveError>(42) },
            "quick",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_expires() {
        let result = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, DocweaveError>(42)
            },
            "slow",
        )
        .await;
        assert!(matches!(result, Err(DocweaveError::Timeout { .. })));
    }
}
