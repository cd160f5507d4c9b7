//! Credential storage contract.

use async_trait::async_trait;

use crate::error::CredentialError;

/// Holds the single bearer token. Last writer wins.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Short name of the backend, for logs.
    fn kind(&self) -> &'static str;

    async fn store_token(&self, token: &str) -> Result<(), CredentialError>;

    async fn get_token(&self) -> Result<Option<String>, CredentialError>;

    async fn clear(&self) -> Result<(), CredentialError>;
}
