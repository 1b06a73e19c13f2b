//! Blocking work on the runtime's bounded blocking pool.

use crate::error::{IngestError, IngestResult};

/// Run `f` on the blocking pool and flatten the join error into
/// [`IngestError::Task`].
pub async fn run_blocking<F, T>(f: F) -> IngestResult<T>
where
    F: FnOnce() -> IngestResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| IngestError::Task(format!("task join error: {e}")))?
}
