//! Durable storage errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupted store at {path}: {message}")]
    Corrupted { path: String, message: String },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = StorageError::from(io_err);
        assert!(err.to_string().contains("IO error"));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_storage_error_corrupted() {
        let err = StorageError::Corrupted {
            path: "/tmp/store.json".to_string(),
            message: "expected object".to_string(),
        };
        assert!(err.to_string().contains("/tmp/store.json"));
        assert!(err.to_string().contains("expected object"));
    }

    #[test]
    fn test_storage_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = StorageError::from(serde_err);
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
