//! Context loading errors.

use thiserror::Error;

use jobfill_auth::AuthError;
use jobfill_protocols::StorageError;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Request failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Context service returned HTTP {0}")]
    Status(u16),

    #[error("Invalid context response: {0}")]
    Decode(String),

    #[error("Invalid résumé URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(
            ContextError::Status(503).to_string(),
            "Context service returned HTTP 503"
        );
    }

    #[test]
    fn test_storage_is_transparent() {
        let err = ContextError::from(StorageError::Backend("locked".to_string()));
        assert_eq!(err.to_string(), "Storage backend error: locked");
    }
}
