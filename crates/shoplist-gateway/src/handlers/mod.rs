//! HTTP request handlers.

pub mod admin;
pub mod health;
pub mod login;
pub mod me;
pub mod users;

use crate::error::ApiError;

/// Run CPU-heavy or file-bound work (password hashing, ledger writes) off the
/// async executor.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
}
