//! Usage tracking and error reports, both best-effort.

use serde_json::{json, Value};

use jobfill_auth::{AuthRequest, TokenCoordinator};
use jobfill_context::BackgroundTasks;

use crate::error::PipelineError;
use crate::pipeline::FillReport;

/// Sends usage events and error reports on the background sink.
#[derive(Clone)]
pub struct Telemetry {
    coordinator: TokenCoordinator,
    tasks: BackgroundTasks,
    activity_url: String,
    errors_url: String,
}

impl Telemetry {
    pub fn new(
        coordinator: TokenCoordinator,
        tasks: BackgroundTasks,
        activity_url: impl Into<String>,
        errors_url: impl Into<String>,
    ) -> Self {
        Self {
            coordinator,
            tasks,
            activity_url: activity_url.into(),
            errors_url: errors_url.into(),
        }
    }

    /// `autofill_used` after a completed run.
    pub fn track_usage(&self, page_url: Option<&str>, report: &FillReport) {
        let body = json!({
            "event_type": "autofill_used",
            "page_url": page_url,
            "metadata": {
                "filled": report.filled,
                "frames": report.frames,
                "resume_uploads": report.resume_uploads,
            },
        });
        let coordinator = self.coordinator.clone();
        let url = self.activity_url.clone();
        self.tasks.spawn("usage_tracking", async move {
            let response = coordinator
                .fetch_with_auth_retry(AuthRequest::post_json(url, body))
                .await
                .map_err(|e| e.to_string())?;
            if response.status().is_success() {
                Ok(())
            } else {
                Err(format!("activity endpoint returned HTTP {}", response.status()))
            }
        });
    }

    /// Report a terminal failure. Works signed out, so no auth is attached.
    pub fn report_error(&self, error: &PipelineError, stage: &str, page_url: Option<&str>) {
        let body = error_report(error, stage, page_url);
        let http = self.coordinator.http().clone();
        let url = self.errors_url.clone();
        self.tasks.spawn("error_report", async move {
            let response = http
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| e.to_string())?;
            if response.status().is_success() {
                Ok(())
            } else {
                Err(format!("error endpoint returned HTTP {}", response.status()))
            }
        });
    }
}

fn error_report(error: &PipelineError, stage: &str, page_url: Option<&str>) -> Value {
    json!({
        "type": error.kind(),
        "message": error.to_string(),
        "context": {"stage": stage},
        "url": page_url,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_report_shape() {
        let body = error_report(
            &PipelineError::MappingFailed { status: 500 },
            "mapping",
            Some("https://jobs.example.com/apply"),
        );
        assert_eq!(body["type"], "mapping_failed");
        assert_eq!(body["context"]["stage"], "mapping");
        assert_eq!(body["url"], "https://jobs.example.com/apply");
        assert!(body["message"].as_str().unwrap().contains("500"));
        assert!(body["timestamp"].is_string());
    }
}
