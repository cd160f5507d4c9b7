//! Submission feedback: what the user finally submitted, for learning.

use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use jobfill_auth::{AuthRequest, TokenCoordinator};
use jobfill_protocols::FieldDescriptor;

use crate::error::PipelineError;
use crate::selectors::selector_kind;

/// One submitted field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmittedField {
    pub fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Overrides the submission's `ats` for this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ats_platform: Option<String>,
    /// Selector that located the field, so the service can learn it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_type: Option<String>,
    #[serde(default)]
    pub autofill_value: Option<String>,
    #[serde(default)]
    pub submitted_value: Option<String>,
    #[serde(default)]
    pub was_edited: bool,
}

impl SubmittedField {
    /// Compare what was filled with what was submitted.
    pub fn from_field(
        field: &FieldDescriptor,
        autofill_value: Option<String>,
        submitted_value: Option<String>,
    ) -> Self {
        let was_edited = match (&autofill_value, &submitted_value) {
            (Some(filled), Some(submitted)) => filled.trim() != submitted.trim(),
            (None, Some(submitted)) => !submitted.trim().is_empty(),
            _ => false,
        };
        let label = field.display_label();
        let selector_used = field
            .selector
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Self {
            fingerprint: field.fingerprint.clone(),
            label: (!label.is_empty()).then(|| label.to_string()),
            field_type: (!field.field_type.is_empty()).then(|| field.field_type.clone()),
            options: field.options.clone(),
            ats_platform: None,
            selector_type: selector_used.as_deref().map(|s| selector_kind(s).to_string()),
            selector_used,
            autofill_value,
            submitted_value,
            was_edited,
        }
    }
}

/// Body of `POST /form-fields/submit-feedback`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionFeedback {
    pub url: String,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ats: Option<String>,
    pub fields: Vec<SubmittedField>,
}

impl SubmissionFeedback {
    /// Feedback for `page_url`; the domain is taken from the URL.
    pub fn new(page_url: &str, ats: Option<String>, fields: Vec<SubmittedField>) -> Self {
        let domain = Url::parse(page_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        Self {
            url: page_url.to_string(),
            domain,
            ats,
            fields,
        }
    }
}

#[derive(Deserialize)]
struct FeedbackResponse {
    #[serde(default)]
    learned: usize,
}

/// Sends submission feedback to the mapping service.
#[derive(Clone)]
pub struct FeedbackReporter {
    coordinator: TokenCoordinator,
    url: String,
}

impl FeedbackReporter {
    pub fn new(coordinator: TokenCoordinator, url: impl Into<String>) -> Self {
        Self {
            coordinator,
            url: url.into(),
        }
    }

    /// Returns how many answers the service learned.
    pub async fn submit(&self, feedback: &SubmissionFeedback) -> Result<usize, PipelineError> {
        let body = serde_json::to_value(feedback)
            .map_err(|e| PipelineError::Network(format!("invalid feedback: {}", e)))?;
        let response = self
            .coordinator
            .fetch_with_auth_retry(AuthRequest::post_json(&self.url, body))
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Network(format!(
                "feedback endpoint returned HTTP {}",
                status
            )));
        }
        let learned = response
            .json::<FeedbackResponse>()
            .await
            .map(|r| r.learned)
            .unwrap_or(0);
        info!(
            "Submitted feedback for {} field(s) on {}, {} learned",
            feedback.fields.len(),
            feedback.domain,
            learned
        );
        Ok(learned)
    }
}
