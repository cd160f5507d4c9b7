//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No config file at {}", .0.display())]
    NotFound(PathBuf),

    #[error("Cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config references ${{{0}}} but the variable is not set")]
    UnsetVariable(String),

    #[error("Variable substitution pattern is invalid: {0}")]
    Substitution(#[from] regex::Error),

    /// `api.base_url` cannot serve as the root of every endpoint.
    #[error("api.base_url {url:?} is unusable: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// First of the validator's errors; `others` counts the rest.
    #[error("Invalid value for {field}: {message}{}", others_suffix(*others))]
    Rejected {
        field: String,
        message: String,
        others: usize,
    },
}

fn others_suffix(others: usize) -> String {
    match others {
        0 => String::new(),
        1 => " (and 1 more problem)".to_string(),
        n => format!(" (and {} more problems)", n),
    }
}
