//! Token kept in the OS keychain, encrypted at rest.

use std::sync::Arc;

use async_trait::async_trait;

use jobfill_protocols::{CredentialError, CredentialStore};

const SERVICE: &str = "jobfill";
const USER: &str = "access_token";

/// Keychain-backed token store.
///
/// Keychain calls block, so each one runs on the blocking pool.
pub struct KeychainCredentialStore {
    entry: Arc<keyring::Entry>,
}

impl KeychainCredentialStore {
    pub fn new() -> Result<Self, CredentialError> {
        let entry = keyring::Entry::new(SERVICE, USER).map_err(keychain_error)?;
        Ok(Self {
            entry: Arc::new(entry),
        })
    }

    async fn with_entry<T, F>(&self, op: F) -> Result<T, CredentialError>
    where
        T: Send + 'static,
        F: FnOnce(&keyring::Entry) -> Result<T, keyring::Error> + Send + 'static,
    {
        let entry = Arc::clone(&self.entry);
        tokio::task::spawn_blocking(move || op(&entry))
            .await
            .map_err(|e| CredentialError::Unavailable(e.to_string()))?
            .map_err(keychain_error)
    }
}

fn keychain_error(e: keyring::Error) -> CredentialError {
    match e {
        keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
            CredentialError::Unavailable(e.to_string())
        }
        other => CredentialError::Keychain(other.to_string()),
    }
}

#[async_trait]
impl CredentialStore for KeychainCredentialStore {
    fn kind(&self) -> &'static str {
        "keychain"
    }

    async fn store_token(&self, token: &str) -> Result<(), CredentialError> {
        let token = token.to_string();
        self.with_entry(move |entry| entry.set_password(&token)).await
    }

    async fn get_token(&self) -> Result<Option<String>, CredentialError> {
        self.with_entry(|entry| match entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn clear(&self) -> Result<(), CredentialError> {
        self.with_entry(|entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        })
        .await
    }
}
