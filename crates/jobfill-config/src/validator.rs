//! Configuration validation.

use std::collections::HashSet;

use url::Url;

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    base_url: Option<ConfigError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// The warnings, or the first error as a [`ConfigError`].
    ///
    /// An unusable base URL wins over everything else.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        if let Some(err) = self.base_url {
            return Err(err);
        }
        let others = self.errors.len().saturating_sub(1);
        match self.errors.into_iter().next() {
            Some(err) => Err(ConfigError::Rejected {
                field: err.path,
                message: err.message,
                others,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_api(config, &mut result);
        Self::validate_auth(config, &mut result);
        Self::validate_cache(config, &mut result);
        Self::validate_scrape(config, &mut result);
        Self::validate_browser(config, &mut result);

        result
    }

    fn validate_api(config: &Config, result: &mut ValidationResult) {
        match config.api.parsed_base() {
            Ok(base) => {
                if base.scheme() == "http" && !is_local(&base) {
                    result.add_warning(ValidationWarning::new(
                        "api.base_url",
                        "base_url uses plain http for a non-local host; tokens travel unencrypted",
                    ));
                }
            }
            Err(err) => {
                let message = match &err {
                    ConfigError::InvalidBaseUrl { reason, .. } => reason.clone(),
                    other => other.to_string(),
                };
                result.add_error(ValidationError::new("api.base_url", message));
                result.base_url = Some(err);
            }
        }

        if !config.api.extension_prefix.is_empty() && !config.api.extension_prefix.starts_with('/')
        {
            result.add_error(ValidationError::new(
                "api.extension_prefix",
                "extension_prefix must start with '/'",
            ));
        }

        if config.api.timeout_seconds == 0 {
            result.add_error(ValidationError::new(
                "api.timeout_seconds",
                "timeout_seconds must be greater than 0",
            ));
        }
    }

    fn validate_auth(config: &Config, result: &mut ValidationResult) {
        let mut seen = HashSet::new();
        for port in &config.auth.alternate_local_ports {
            if *port == 0 {
                result.add_error(ValidationError::new(
                    "auth.alternate_local_ports",
                    "Port cannot be 0",
                ));
            } else if !seen.insert(port) {
                result.add_warning(ValidationWarning::new(
                    "auth.alternate_local_ports",
                    format!("Port {} listed more than once", port),
                ));
            }
        }

        if config.auth.sync_timeout_ms > 5_000 {
            result.add_warning(ValidationWarning::new(
                "auth.sync_timeout_ms",
                "sync_timeout_ms is very high (>5000), every request waits this long when no session answers",
            ));
        }
    }

    fn validate_cache(config: &Config, result: &mut ValidationResult) {
        let cache = &config.cache;
        if cache.durable_max_entries == 0 {
            result.add_error(ValidationError::new(
                "cache.durable_max_entries",
                "durable_max_entries must be greater than 0",
            ));
        }

        if cache.durable_retain_entries >= cache.durable_max_entries {
            result.add_error(ValidationError::new(
                "cache.durable_retain_entries",
                format!(
                    "durable_retain_entries ({}) must be lower than durable_max_entries ({})",
                    cache.durable_retain_entries, cache.durable_max_entries
                ),
            ));
        }

        if cache.durable_ttl_days == 0 {
            result.add_warning(ValidationWarning::new(
                "cache.durable_ttl_days",
                "durable_ttl_days is 0, the durable fingerprint cache never hits",
            ));
        }

        if cache.session_capacity == 0 {
            result.add_warning(ValidationWarning::new(
                "cache.session_capacity",
                "session_capacity is 0, the session cache is disabled",
            ));
        }
    }

    fn validate_scrape(config: &Config, result: &mut ValidationResult) {
        if config.scrape.attempts == 0 {
            result.add_error(ValidationError::new(
                "scrape.attempts",
                "attempts must be greater than 0",
            ));
        }

        if config.scrape.scope.trim().is_empty() {
            result.add_error(ValidationError::new("scrape.scope", "scope cannot be empty"));
        }
    }

    fn validate_browser(config: &Config, result: &mut ValidationResult) {
        if config.browser.debug_port == 0 {
            result.add_error(ValidationError::new("browser.debug_port", "Port cannot be 0"));
        }

        if config.browser.collaborator_scripts.is_empty() {
            result.add_warning(ValidationWarning::new(
                "browser.collaborator_scripts",
                "No collaborator scripts configured, frames without a listener cannot be recovered",
            ));
        }

        for path in config.browser.resolved_scripts() {
            if !path.exists() {
                result.add_warning(ValidationWarning::new(
                    "browser.collaborator_scripts",
                    format!("Collaborator script does not exist: {:?}", path),
                ));
            }
        }
    }
}

fn is_local(base: &Url) -> bool {
    matches!(base.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"))
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
