//! Client for the remote mapping service.

use serde_json::json;
use tracing::debug;

use jobfill_auth::{AuthRequest, TokenCoordinator};
use jobfill_protocols::{AutofillContext, FieldDescriptor, MappingResponse};

use crate::error::PipelineError;

/// `POST /form-fields/map` through the coordinator's retrying fetch.
#[derive(Clone)]
pub struct MappingClient {
    coordinator: TokenCoordinator,
    url: String,
}

impl MappingClient {
    pub fn new(coordinator: TokenCoordinator, url: impl Into<String>) -> Self {
        Self {
            coordinator,
            url: url.into(),
        }
    }

    /// Ask for values for `fields`. Raw DOM ids are stripped before sending.
    pub async fn map_fields(
        &self,
        fields: &[FieldDescriptor],
        context: &AutofillContext,
    ) -> Result<MappingResponse, PipelineError> {
        let redacted: Vec<FieldDescriptor> = fields.iter().map(FieldDescriptor::redacted).collect();
        let body = json!({
            "fields": redacted,
            "profile": context.profile,
            "custom_answers": context.custom_answers,
            "resume_text": context.resume_text,
        });

        debug!("Requesting mappings for {} field(s)", fields.len());
        let response = self
            .coordinator
            .fetch_with_auth_retry(AuthRequest::post_json(&self.url, body))
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::MappingFailed {
                status: status.as_u16(),
            });
        }
        response
            .json::<MappingResponse>()
            .await
            .map_err(|e| PipelineError::Network(format!("invalid mapping response: {}", e)))
    }
}
