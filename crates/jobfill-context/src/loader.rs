//! Autofill context loading.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use jobfill_auth::{AuthError, AuthRequest, TokenCoordinator};
use jobfill_config::Config;
use jobfill_protocols::{
    load_json, save_json, AutofillContext, Clock, DurableStore, ResumeStore,
};

use crate::error::ContextError;
use crate::tasks::BackgroundTasks;

/// Durable storage key of the last fetched context.
pub const CONTEXT_KEY: &str = "autofillContext";

const DEFAULT_RESUME_NAME: &str = "resume.pdf";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredContext {
    context: AutofillContext,
    /// Milliseconds since the Unix epoch.
    fetched_at: i64,
}

/// Settings for [`ContextLoader`].
#[derive(Debug, Clone)]
pub struct ContextSettings {
    pub context_url: String,
    /// Base that relative résumé references resolve against.
    pub base_url: String,
    pub ttl_millis: i64,
}

impl ContextSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            context_url: config.api.context_url(),
            base_url: config.api.base().to_string(),
            ttl_millis: config.cache.context_ttl_millis(),
        }
    }
}

/// Loads the user's profile, saved answers and résumé reference.
///
/// Order of preference: the durable copy once this process has loaded it,
/// the durable copy while younger than the TTL, then the context service.
/// A failed fetch yields an empty context, never an error.
pub struct ContextLoader {
    coordinator: TokenCoordinator,
    store: Arc<dyn DurableStore>,
    resumes: Arc<dyn ResumeStore>,
    tasks: BackgroundTasks,
    clock: Arc<dyn Clock>,
    settings: ContextSettings,
    loaded: AtomicBool,
}

impl ContextLoader {
    pub fn new(
        coordinator: TokenCoordinator,
        store: Arc<dyn DurableStore>,
        resumes: Arc<dyn ResumeStore>,
        tasks: BackgroundTasks,
        clock: Arc<dyn Clock>,
        settings: ContextSettings,
    ) -> Self {
        Self {
            coordinator,
            store,
            resumes,
            tasks,
            clock,
            settings,
            loaded: AtomicBool::new(false),
        }
    }

    pub async fn load_context(&self) -> AutofillContext {
        let stored = self.read_stored().await;

        if let Some(stored) = &stored {
            if self.is_loaded() && stored.context.is_complete() {
                debug!("Autofill context already loaded this session");
                return stored.context.clone();
            }
            let age = self.clock.now_millis() - stored.fetched_at;
            if age < self.settings.ttl_millis {
                debug!("Using durable autofill context ({} ms old)", age);
                self.loaded.store(true, Ordering::SeqCst);
                return stored.context.clone();
            }
        }

        match self.fetch().await {
            Ok(context) => {
                let record = StoredContext {
                    context: context.clone(),
                    fetched_at: self.clock.now_millis(),
                };
                if let Err(e) = save_json(self.store.as_ref(), CONTEXT_KEY, &record).await {
                    warn!("Failed to persist autofill context: {}", e);
                }
                self.loaded.store(true, Ordering::SeqCst);
                info!(
                    "Loaded autofill context: {} profile keys, {} custom answers",
                    context.profile.len(),
                    context.custom_answers.len()
                );
                self.spawn_resume_prefetch(&context);
                context
            }
            Err(e) => {
                warn!("Failed to load autofill context: {}", e);
                AutofillContext::default()
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Forget the loaded flag and the durable copy.
    pub async fn invalidate(&self) -> Result<(), ContextError> {
        self.loaded.store(false, Ordering::SeqCst);
        self.store.remove(CONTEXT_KEY).await?;
        Ok(())
    }

    async fn read_stored(&self) -> Option<StoredContext> {
        match load_json(self.store.as_ref(), CONTEXT_KEY).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Ignoring unreadable stored context: {}", e);
                None
            }
        }
    }

    async fn fetch(&self) -> Result<AutofillContext, ContextError> {
        let response = self
            .coordinator
            .fetch_with_auth_retry(AuthRequest::get(&self.settings.context_url))
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ContextError::Status(status.as_u16()));
        }
        response
            .json::<AutofillContext>()
            .await
            .map_err(|e| ContextError::Decode(e.to_string()))
    }

    fn spawn_resume_prefetch(&self, context: &AutofillContext) {
        let Some(reference) = context
            .resume_url
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
        else {
            return;
        };
        let url = match resolve_resume_url(&self.settings.base_url, reference) {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping résumé prefetch: {}", e);
                return;
            }
        };
        let name = context
            .resume_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| file_name(&url));

        let coordinator = self.coordinator.clone();
        let resumes = Arc::clone(&self.resumes);
        self.tasks.spawn("resume_prefetch", async move {
            fetch_resume(coordinator, resumes, url, name).await
        });
    }
}

async fn fetch_resume(
    coordinator: TokenCoordinator,
    resumes: Arc<dyn ResumeStore>,
    url: Url,
    name: String,
) -> Result<(), ContextError> {
    let response = coordinator
        .fetch_with_auth_retry(AuthRequest::get(url.as_str()))
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ContextError::Status(status.as_u16()));
    }
    let bytes = response.bytes().await.map_err(AuthError::from)?;
    resumes.save_resume(&name, &bytes).await?;
    debug!("Prefetched résumé {} ({} bytes)", name, bytes.len());
    Ok(())
}

/// Resolve a résumé reference, absolute or origin-relative, against the API base.
pub(crate) fn resolve_resume_url(base: &str, reference: &str) -> Result<Url, ContextError> {
    let base = Url::parse(base).map_err(|e| ContextError::InvalidUrl(format!("{}: {}", base, e)))?;
    base.join(reference)
        .map_err(|e| ContextError::InvalidUrl(format!("{}: {}", reference, e)))
}

fn file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back().map(str::to_string))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_RESUME_NAME.to_string())
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
