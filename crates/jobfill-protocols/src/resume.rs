//! Résumé binary storage contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// A stored résumé, base64-encoded the way the in-page uploader expects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeData {
    pub name: String,
    /// Base64 of the file bytes.
    pub buffer: String,
}

/// Keeps the résumé file that is attached to upload fields.
#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn save_resume(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError>;

    async fn load_resume(&self) -> Result<Option<ResumeData>, StorageError>;
}
