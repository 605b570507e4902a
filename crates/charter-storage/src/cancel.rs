//! Cancellation checkpoints
//!
//! Every storage call takes a [`CancellationToken`]. Multi-step operations
//! call [`checkpoint`] before each step, not only at entry.

use crate::error::StorageError;

pub use tokio_util::sync::CancellationToken;

/// Fail with [`StorageError::Cancelled`] if `token` has been cancelled
///
/// # Errors
/// [`StorageError::Cancelled`].
#[inline]
pub fn checkpoint(token: &CancellationToken) -> Result<(), StorageError> {
    if token.is_cancelled() {
        Err(StorageError::Cancelled)
    } else {
        Ok(())
    }
}
