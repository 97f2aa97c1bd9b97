//! Shared timeout wrapper for synchronous redb operations run on the
//! blocking thread pool.

use std::time::Duration;

use memory_core::{Error, Result};

/// Timeout for a single blocking database operation.
const DB_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a synchronous redb closure on the blocking pool, bounded by
/// [`DB_OPERATION_TIMEOUT`].
pub(crate) async fn with_db_timeout<T, F>(operation: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(DB_OPERATION_TIMEOUT, tokio::task::spawn_blocking(operation)).await
    {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(Error::Storage(format!("task join error: {join_err}"))),
        Err(_) => Err(Error::Storage(format!(
            "database operation timed out after {DB_OPERATION_TIMEOUT:?}"
        ))),
    }
}
