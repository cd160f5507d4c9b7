//! Authentication errors.

use thiserror::Error;

use jobfill_protocols::CredentialError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Credential store error: {0}")]
    Credential(#[from] CredentialError),
}
