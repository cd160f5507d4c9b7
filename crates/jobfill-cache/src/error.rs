//! Cache error types.

use thiserror::Error;

use jobfill_protocols::StorageError;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Fingerprint cache storage error: {0}")]
    Storage(#[from] StorageError),
}
