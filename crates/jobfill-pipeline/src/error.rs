//! Pipeline error types.

use thiserror::Error;

use jobfill_auth::AuthError;

/// Terminal failure of a pipeline run.
///
/// Per-frame failures are not errors: they are recorded in the run's
/// [`FillReport`](crate::FillReport) and only lower its totals.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Mapping service returned HTTP {status}")]
    MappingFailed { status: u16 },

    #[error("No form fields found after {attempts} attempt(s)")]
    NoFieldsFound { attempts: u32 },

    #[error("Autofill context is empty")]
    EmptyContext,

    #[error("No mappings for the scraped fields")]
    EmptyMapping,

    #[error("Run superseded by a newer run")]
    Superseded,
}

impl PipelineError {
    /// Short machine-readable kind, used in error reports.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Network(_) => "network",
            PipelineError::MappingFailed { .. } => "mapping_failed",
            PipelineError::NoFieldsFound { .. } => "no_fields",
            PipelineError::EmptyContext => "empty_context",
            PipelineError::EmptyMapping => "empty_mapping",
            PipelineError::Superseded => "superseded",
        }
    }

    /// Text shown to the user when a run ends with this error.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Network(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            PipelineError::MappingFailed { status } => {
                format!("Field mapping failed (HTTP {}). Please try again.", status)
            }
            PipelineError::NoFieldsFound { .. } => {
                "No fillable form fields were found on this page.".to_string()
            }
            PipelineError::EmptyContext => {
                "Your profile is empty. Complete your profile or sign in again, then retry."
                    .to_string()
            }
            PipelineError::EmptyMapping => {
                "None of the fields on this page could be matched to your profile.".to_string()
            }
            PipelineError::Superseded => {
                "This autofill was replaced by a newer one.".to_string()
            }
        }
    }
}

impl From<AuthError> for PipelineError {
    fn from(e: AuthError) -> Self {
        PipelineError::Network(e.to_string())
    }
}
