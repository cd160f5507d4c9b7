//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::error::ConfigError;

mod schema_runtime;

pub use schema_runtime::*;

/// Shared default helper used by submodules.
pub(crate) fn default_true() -> bool {
    true
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub scrape: ScrapeConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub browser: BrowserConfig,
}

impl Config {
    /// `~/.jobfill`, or `./.jobfill` when no home directory is known.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".jobfill")
    }

    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    pub fn logs_dir() -> PathBuf {
        Self::home_dir().join("logs")
    }
}

/// Remote API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API root, e.g. `https://app.example.com/api`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path prefix of the extension-facing endpoints.
    #[serde(default = "default_extension_prefix")]
    pub extension_prefix: String,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            extension_prefix: default_extension_prefix(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_extension_prefix() -> String {
    "/chrome-extension".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl ApiConfig {
    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// `base_url` parsed, rejecting anything that cannot root the endpoints.
    pub fn parsed_base(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason,
        };

        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            return Err(invalid("it is empty".to_string()));
        }
        let url = Url::parse(trimmed).map_err(|e| match e {
            url::ParseError::RelativeUrlWithoutBase => {
                invalid("it must start with http:// or https://".to_string())
            }
            other => invalid(other.to_string()),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid(format!(
                "scheme {:?} is not http or https",
                url.scheme()
            )));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("it has no host".to_string()));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("it must not carry a query or fragment".to_string()));
        }
        Ok(url)
    }

    fn extension_url(&self, path: &str) -> String {
        let prefix = self.extension_prefix.trim_end_matches('/');
        format!("{}{}{}", self.base(), prefix, path)
    }

    pub fn context_url(&self) -> String {
        self.extension_url("/autofill/context")
    }

    pub fn mapping_url(&self) -> String {
        self.extension_url("/form-fields/map")
    }

    pub fn feedback_url(&self) -> String {
        self.extension_url("/form-fields/submit-feedback")
    }

    pub fn errors_url(&self) -> String {
        self.extension_url("/errors")
    }

    pub fn selectors_url(&self) -> String {
        self.extension_url("/selectors/best-batch")
    }

    pub fn activity_url(&self) -> String {
        format!("{}/activity/track", self.base())
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }
}

/// Credential and refresh configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Local ports tried as refresh fallbacks when the API runs on localhost.
    #[serde(default = "default_alternate_ports")]
    pub alternate_local_ports: Vec<u16>,

    /// How long to wait for an open session to hand over its token.
    #[serde(default = "default_sync_timeout_ms")]
    pub sync_timeout_ms: u64,

    /// URL prefix of web-app pages that share the token. Unset means any
    /// page on the API host.
    #[serde(default)]
    pub web_app_url: Option<String>,

    /// `localStorage` key under which the web app keeps its token.
    #[serde(default = "default_session_token_key")]
    pub session_token_key: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            alternate_local_ports: default_alternate_ports(),
            sync_timeout_ms: default_sync_timeout_ms(),
            web_app_url: None,
            session_token_key: default_session_token_key(),
        }
    }
}

impl AuthConfig {
    /// Prefix a page URL must start with to count as a web-app session.
    pub fn web_app_prefix(&self, api: &ApiConfig) -> Option<String> {
        if let Some(url) = self.web_app_url.as_deref().map(str::trim) {
            if !url.is_empty() {
                return Some(url.trim_end_matches('/').to_string());
            }
        }
        let base = api.parsed_base().ok()?;
        let origin = base.origin();
        origin.is_tuple().then(|| origin.ascii_serialization())
    }
}

fn default_alternate_ports() -> Vec<u16> {
    vec![8000]
}

fn default_sync_timeout_ms() -> u64 {
    500
}

fn default_session_token_key() -> String {
    "accessToken".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
