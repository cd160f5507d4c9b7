//! Résumé binary kept in the durable store.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use jobfill_protocols::{load_json, save_json, DurableStore, ResumeData, ResumeStore, StorageError};

pub const RESUME_KEY: &str = "resumeFile";

/// [`ResumeStore`] over a [`DurableStore`], base64 encoded.
pub struct ResumeVault {
    store: Arc<dyn DurableStore>,
}

impl ResumeVault {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResumeStore for ResumeVault {
    async fn save_resume(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let data = ResumeData {
            name: name.to_string(),
            buffer: STANDARD.encode(bytes),
        };
        save_json(self.store.as_ref(), RESUME_KEY, &data).await?;
        debug!("Stored résumé {} ({} bytes)", name, bytes.len());
        Ok(())
    }

    async fn load_resume(&self) -> Result<Option<ResumeData>, StorageError> {
        load_json(self.store.as_ref(), RESUME_KEY).await
    }
}
