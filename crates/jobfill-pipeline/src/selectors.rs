//! Learned selectors for fields the service has seen filled before.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use jobfill_auth::{AuthRequest, TokenCoordinator};

/// A selector that located a field on earlier submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorHint {
    pub selector: String,
    #[serde(rename = "type", default)]
    pub selector_type: Option<String>,
    /// Share of earlier uses that found the field.
    #[serde(default)]
    pub rate: f64,
}

/// Hints by fingerprint, best first.
pub type SelectorHints = HashMap<String, Vec<SelectorHint>>;

#[derive(Deserialize)]
struct BestBatchResponse {
    #[serde(default)]
    selectors: SelectorHints,
}

/// `POST /selectors/best-batch` through the coordinator's retrying fetch.
///
/// Hints only help; every failure reads as "no hints".
#[derive(Clone)]
pub struct SelectorClient {
    coordinator: TokenCoordinator,
    url: String,
}

impl SelectorClient {
    pub fn new(coordinator: TokenCoordinator, url: impl Into<String>) -> Self {
        Self {
            coordinator,
            url: url.into(),
        }
    }

    pub async fn best_batch(&self, fingerprints: &[String], ats: Option<&str>) -> SelectorHints {
        if fingerprints.is_empty() {
            return SelectorHints::new();
        }
        let body = json!({
            "fps": fingerprints,
            "ats_platform": ats,
        });

        let response = match self
            .coordinator
            .fetch_with_auth_retry(AuthRequest::post_json(&self.url, body))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Selector lookup failed, filling without hints: {}", e);
                return SelectorHints::new();
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!("Selector lookup returned HTTP {}, filling without hints", status);
            return SelectorHints::new();
        }
        match response.json::<BestBatchResponse>().await {
            Ok(body) => {
                let mut hints = body.selectors;
                hints.retain(|_, list| {
                    list.retain(|h| !h.selector.trim().is_empty());
                    !list.is_empty()
                });
                debug!(
                    "Selector hints for {} of {} fingerprint(s)",
                    hints.len(),
                    fingerprints.len()
                );
                hints
            }
            Err(e) => {
                warn!("Selector lookup returned an unreadable body: {}", e);
                SelectorHints::new()
            }
        }
    }
}

/// Applicant tracking system serving `page_url`, from its host.
pub fn detect_ats(page_url: &str) -> Option<&'static str> {
    let url = Url::parse(page_url).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    const KNOWN: [(&str, &str); 6] = [
        ("greenhouse.io", "greenhouse"),
        ("lever.co", "lever"),
        ("myworkdayjobs.com", "workday"),
        ("workday.com", "workday"),
        ("ashbyhq.com", "ashby"),
        ("smartrecruiters.com", "smartrecruiters"),
    ];
    KNOWN
        .iter()
        .find(|(domain, _)| host == *domain || host.ends_with(&format!(".{}", domain)))
        .map(|(_, ats)| *ats)
}

/// Best guess at the kind of `selector`, as the service records it.
pub fn selector_kind(selector: &str) -> &'static str {
    let selector = selector.trim();
    if selector.starts_with('/') || selector.starts_with("(/") {
        "xpath"
    } else if selector.len() > 1
        && selector.starts_with('#')
        && selector[1..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        "id"
    } else if selector.contains("[name=") {
        "name"
    } else {
        "css"
    }
}
