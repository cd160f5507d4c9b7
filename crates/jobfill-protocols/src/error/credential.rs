//! Credential storage errors.

use thiserror::Error;

use super::StorageError;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Keychain error: {0}")]
    Keychain(String),

    #[error("Credential backend unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
