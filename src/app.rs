//! Wiring of stores, coordinator and pipeline from configuration.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use jobfill_auth::{select_credential_store, AuthSettings, NoopSessionSync, TokenCoordinator};
use jobfill_cache::FingerprintCache;
use jobfill_config::{Config, ConfigLoader, ConfigValidator};
use jobfill_context::{BackgroundTasks, ContextLoader, ContextSettings, ResumeVault};
use jobfill_frames::cdp::{load_scripts, CdpClient, CdpFrameTransport, CdpSessionSync};
use jobfill_frames::FrameBroadcastChannel;
use jobfill_pipeline::{AutofillPipeline, PipelineComponents, PipelineSettings};
use jobfill_protocols::{Clock, DurableStore, SessionSync, SystemClock, TabId};
use jobfill_storage::JsonFileStore;

pub(crate) type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Long-lived services shared by every subcommand.
pub(crate) struct App {
    pub config: Config,
    pub coordinator: TokenCoordinator,
    pub cache: Arc<FingerprintCache>,
    pub context: Arc<ContextLoader>,
    pub vault: Arc<ResumeVault>,
    pub tasks: BackgroundTasks,
    /// Browser connection, when Chrome was reachable at startup.
    browser: Option<Arc<CdpClient>>,
}

impl App {
    /// Load configuration and open the durable store.
    pub async fn open(config_path: &Path) -> AppResult<Self> {
        let config = ConfigLoader::load_or_default(config_path)?;
        let warnings = ConfigValidator::validate(&config).into_result()?;
        for warning in warnings {
            warn!("Config {}: {}", warning.path, warning.message);
        }
        debug!("Using API at {}", config.api.base());

        let store_path = config.storage.resolved_path();
        let store: Arc<dyn DurableStore> = Arc::new(JsonFileStore::open(&store_path).await?);
        debug!("Durable store at {}", store_path.display());

        let browser = match CdpClient::connect(&config.browser.debug_url()).await {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                debug!("Browser not reachable, token sync disabled: {}", e);
                None
            }
        };
        let sync = session_sync(&config, browser.as_ref());

        let credentials = select_credential_store(config.storage.credentials, store.clone()).await?;
        let coordinator =
            TokenCoordinator::new(AuthSettings::from_config(&config), credentials, sync)?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let tasks = BackgroundTasks::new();
        let vault = Arc::new(ResumeVault::new(store.clone()));
        let cache = Arc::new(FingerprintCache::from_config(
            &config.cache,
            store.clone(),
            clock.clone(),
        ));
        let context = Arc::new(ContextLoader::new(
            coordinator.clone(),
            store,
            vault.clone(),
            tasks.clone(),
            clock,
            ContextSettings::from_config(&config),
        ));

        Ok(Self {
            config,
            coordinator,
            cache,
            context,
            vault,
            tasks,
            browser,
        })
    }

    /// Connect to the browser and build a pipeline for it.
    ///
    /// `tab` is a target id or a URL substring; the resolved target id is
    /// returned alongside the pipeline.
    pub async fn pipeline(&self, tab: &str) -> AppResult<(AutofillPipeline, TabId)> {
        let browser = &self.config.browser;
        let client = match &self.browser {
            Some(client) => client.clone(),
            None => Arc::new(CdpClient::connect(&browser.debug_url()).await?),
        };
        let page = client.find_page(tab).await?;
        info!("Filling tab {} ({})", page.id, page.url);

        let scripts = load_scripts(&browser.resolved_scripts()).await?;
        debug!("Loaded {} collaborator script(s)", scripts.len());
        let transport = Arc::new(CdpFrameTransport::new(client, scripts));

        let components = PipelineComponents {
            frames: FrameBroadcastChannel::new(transport),
            coordinator: self.coordinator.clone(),
            cache: self.cache.clone(),
            context: self.context.clone(),
            resumes: self.vault.clone(),
            tasks: self.tasks.clone(),
        };
        let pipeline = AutofillPipeline::new(components, PipelineSettings::from_config(&self.config));
        Ok((pipeline, TabId::new(page.id)))
    }

    /// Wait for background reports before the process exits.
    pub async fn shutdown(&self) {
        self.tasks.close_and_wait().await;
        let metrics = self.tasks.metrics();
        debug!(
            "Background tasks: {} spawned, {} failed",
            metrics.spawned, metrics.failed
        );
    }
}

/// Token sync with web-app tabs when a browser is connected.
fn session_sync(config: &Config, browser: Option<&Arc<CdpClient>>) -> Arc<dyn SessionSync> {
    let prefix = config.auth.web_app_prefix(&config.api);
    match (browser, prefix) {
        (Some(client), Some(prefix)) => {
            debug!("Sharing the token with web-app tabs under {}", prefix);
            Arc::new(CdpSessionSync::new(
                client.clone(),
                prefix,
                config.auth.session_token_key.clone(),
            ))
        }
        _ => Arc::new(NoopSessionSync),
    }
}
