//! Ledger operation timeout helpers
//!
//! Bounds every store call so a stuck storage backend surfaces as
//! [`LedgerError::Timeout`] instead of hanging the caller. A timed-out
//! operation is dropped, which never leaves a posting half applied.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use super::errors::{LedgerError, LedgerResult};

/// Default timeout for a single ledger operation (5 seconds)
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Execute a ledger operation with timeout
///
/// # Arguments
///
/// * `duration` - Timeout duration
/// * `future` - Async operation to execute
///
/// # Returns
///
/// * `LedgerResult<T>` - Result of the operation or `LedgerError::Timeout`
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> LedgerResult<T>
where
    F: Future<Output = LedgerResult<T>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => {
            log::warn!("Ledger operation timed out after {:?}", duration);
            Err(LedgerError::Timeout(duration))
        }
    }
}
