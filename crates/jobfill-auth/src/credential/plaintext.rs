//! Token kept in the durable store as plain text.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use jobfill_protocols::{CredentialError, CredentialStore, DurableStore};

const TOKEN_KEY: &str = "accessToken";

/// Fallback store for machines without a usable keychain.
pub struct PlaintextCredentialStore {
    durable: Arc<dyn DurableStore>,
}

impl PlaintextCredentialStore {
    pub fn new(durable: Arc<dyn DurableStore>) -> Self {
        Self { durable }
    }
}

#[async_trait]
impl CredentialStore for PlaintextCredentialStore {
    fn kind(&self) -> &'static str {
        "plaintext"
    }

    async fn store_token(&self, token: &str) -> Result<(), CredentialError> {
        self.durable
            .set(TOKEN_KEY, Value::String(token.to_string()))
            .await?;
        Ok(())
    }

    async fn get_token(&self) -> Result<Option<String>, CredentialError> {
        let value = self.durable.get(TOKEN_KEY).await?;
        Ok(value
            .as_ref()
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string))
    }

    async fn clear(&self) -> Result<(), CredentialError> {
        self.durable.remove(TOKEN_KEY).await?;
        Ok(())
    }
}
