//! Runtime configuration types (cache, scrape, storage, browser).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::default_true;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Fingerprint and context cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a durable fingerprint entry.
    #[serde(default = "default_durable_ttl_days")]
    pub durable_ttl_days: u32,

    /// Entry count above which the durable tier is swept.
    #[serde(default = "default_durable_max")]
    pub durable_max_entries: usize,

    /// Entries kept by a sweep, newest first.
    #[serde(default = "default_durable_retain")]
    pub durable_retain_entries: usize,

    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: u64,

    #[serde(default = "default_session_capacity")]
    pub session_capacity: usize,

    /// Lifetime of the durable autofill context copy.
    #[serde(default = "default_context_ttl")]
    pub context_ttl_seconds: u64,
}

fn default_durable_ttl_days() -> u32 {
    7
}

fn default_durable_max() -> usize {
    500
}

fn default_durable_retain() -> usize {
    400
}

fn default_session_ttl() -> u64 {
    300
}

fn default_session_capacity() -> usize {
    30
}

fn default_context_ttl() -> u64 {
    600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            durable_ttl_days: default_durable_ttl_days(),
            durable_max_entries: default_durable_max(),
            durable_retain_entries: default_durable_retain(),
            session_ttl_seconds: default_session_ttl(),
            session_capacity: default_session_capacity(),
            context_ttl_seconds: default_context_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn durable_ttl_millis(&self) -> i64 {
        i64::from(self.durable_ttl_days) * MILLIS_PER_DAY
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    pub fn context_ttl_millis(&self) -> i64 {
        (self.context_ttl_seconds as i64).saturating_mul(1000)
    }
}

/// Scrape stage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Base delay; attempt `n` waits `n * backoff_ms` before the next one.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    #[serde(default = "default_scope")]
    pub scope: String,

    #[serde(default = "default_true")]
    pub expand_select_options: bool,
}

fn default_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    400
}

fn default_scope() -> String {
    "all".to_string()
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            backoff_ms: default_backoff_ms(),
            scope: default_scope(),
            expand_select_options: default_true(),
        }
    }
}

impl ScrapeConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Where the bearer token is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// Keychain when it works on this machine, plaintext otherwise.
    #[default]
    Auto,
    Keychain,
    Plaintext,
}

/// Durable storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,

    #[serde(default)]
    pub credentials: CredentialBackend,
}

fn default_storage_path() -> String {
    "~/.jobfill/storage.json".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            credentials: CredentialBackend::default(),
        }
    }
}

impl StorageConfig {
    /// Storage path with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).as_ref())
    }
}

/// Browser (DevTools) connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_debug_host")]
    pub debug_host: String,

    #[serde(default = "default_debug_port")]
    pub debug_port: u16,

    /// Scripts injected into a frame that has no collaborator listening.
    #[serde(default)]
    pub collaborator_scripts: Vec<String>,
}

fn default_debug_host() -> String {
    "127.0.0.1".to_string()
}

fn default_debug_port() -> u16 {
    9222
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            debug_host: default_debug_host(),
            debug_port: default_debug_port(),
            collaborator_scripts: Vec::new(),
        }
    }
}

impl BrowserConfig {
    pub fn debug_url(&self) -> String {
        format!("http://{}:{}", self.debug_host, self.debug_port)
    }

    pub fn resolved_scripts(&self) -> Vec<PathBuf> {
        self.collaborator_scripts
            .iter()
            .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
            .collect()
    }
}
