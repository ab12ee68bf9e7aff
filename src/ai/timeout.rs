//! Per-Attempt Timeouts
//!
//! Bounds a single backend attempt on the client side. An expired attempt
//! becomes `CopyError::Timeout`, which classifies as transient and is retried
//! like any other network fault.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::ai::timeout::with_timeout;
//!
//! let raw = with_timeout(
//!     Duration::from_secs(120),
//!     backend.generate_structured(model, &prompt, &schema),
//!     "sales_script",
//! ).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::types::{CopyError, Result};

/// Execute an async operation with a timeout
///
/// A zero duration disables the bound.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if timeout.is_zero() {
        return future.await;
    }

    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(CopyError::timeout(operation_name, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorCategory;

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(
            Duration::from_secs(1),
            async { Ok::<_, CopyError>(42) },
            "test operation",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_timeout_expires_as_transient() {
        let result = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, CopyError>(42)
            },
            "slow operation",
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, CopyError::Timeout { .. }));
        assert_eq!(err.category(), ErrorCategory::Transient);
    }

    #[tokio::test]
    async fn test_zero_timeout_is_unbounded() {
        let result = with_timeout(
            Duration::ZERO,
            async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok::<_, CopyError>("done")
            },
            "unbounded",
        )
        .await;
        assert_eq!(result.unwrap(), "done");
    }
}
