//! The autofill pipeline state machine.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use jobfill_auth::TokenCoordinator;
use jobfill_cache::{session_key, FingerprintCache, Mappings};
use jobfill_config::Config;
use jobfill_context::{BackgroundTasks, ContextLoader};
use jobfill_frames::{FrameBroadcastChannel, FrameOutcome};
use jobfill_protocols::{
    AutofillContext, FieldDescriptor, FillResponse, FrameId, FrameMessage, MappingResponse,
    ResumeStore, ScrapeRequest, TabId,
};

use crate::dispatch::DispatchPlan;
use crate::error::PipelineError;
use crate::mapping::MappingClient;
use crate::scrape::scrape_with_retry;
use crate::selectors::{detect_ats, SelectorClient};
use crate::state::PipelineState;
use crate::telemetry::Telemetry;

/// Knobs of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub mapping_url: String,
    pub selectors_url: String,
    pub activity_url: String,
    pub errors_url: String,
    pub scrape_attempts: u32,
    pub scrape_backoff: Duration,
    pub scope: String,
    pub expand_select_options: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            mapping_url: config.api.mapping_url(),
            selectors_url: config.api.selectors_url(),
            activity_url: config.api.activity_url(),
            errors_url: config.api.errors_url(),
            scrape_attempts: config.scrape.attempts,
            scrape_backoff: config.scrape.backoff(),
            scope: config.scrape.scope.clone(),
            expand_select_options: config.scrape.expand_select_options,
        }
    }
}

/// The collaborators a pipeline drives.
pub struct PipelineComponents {
    pub frames: FrameBroadcastChannel,
    pub coordinator: TokenCoordinator,
    pub cache: Arc<FingerprintCache>,
    pub context: Arc<ContextLoader>,
    pub resumes: Arc<dyn ResumeStore>,
    pub tasks: BackgroundTasks,
}

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// URL of the page, for reports.
    pub page_url: Option<String>,
    /// Overrides the configured scrape scope.
    pub scope: Option<String>,
    /// Applicant tracking system of the page; guessed from `page_url` when unset.
    pub ats: Option<String>,
}

impl RunOptions {
    fn ats(&self) -> Option<String> {
        self.ats
            .clone()
            .or_else(|| self.page_url.as_deref().and_then(detect_ats).map(str::to_string))
    }
}

/// One frame that did not take part in the fill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameFailure {
    pub frame_id: FrameId,
    pub error: String,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FillReport {
    pub run_id: Uuid,
    /// Fields the page collaborators report as filled.
    pub filled: usize,
    pub resume_uploads: usize,
    /// Frames the fill was sent to.
    pub frames: usize,
    pub failed_frames: Vec<FrameFailure>,
    pub fields_scraped: usize,
    /// Values sent to the page.
    pub values_dispatched: usize,
    pub cache_hits: usize,
    /// Fields sent to the mapping service.
    pub mapped: usize,
    /// The whole request was answered from the session tier.
    pub session_hit: bool,
    pub dropped_by_cap: usize,
    /// Dispatched fields that carry a learned selector.
    pub selector_hints: usize,
    /// Profile attributes the service needed but the user has not filled in.
    pub unfilled_profile_keys: Vec<String>,
}

/// Merged mappings and how they were obtained.
struct Resolution {
    mappings: Mappings,
    cache_hits: usize,
    mapped: usize,
    session_hit: bool,
    unfilled_profile_keys: Vec<String>,
}

/// Scrape, load context, resolve mappings, dispatch.
///
/// Runs may overlap. Each run takes a generation number, and a run that
/// has been overtaken by a newer one stops with [`PipelineError::Superseded`]
/// before touching the page. Its mapping results stay cached.
pub struct AutofillPipeline {
    components: PipelineComponents,
    settings: PipelineSettings,
    mapper: MappingClient,
    selectors: SelectorClient,
    telemetry: Telemetry,
    generation: AtomicU64,
    state: watch::Sender<PipelineState>,
}

impl AutofillPipeline {
    pub fn new(components: PipelineComponents, settings: PipelineSettings) -> Self {
        let mapper = MappingClient::new(components.coordinator.clone(), &settings.mapping_url);
        let selectors = SelectorClient::new(components.coordinator.clone(), &settings.selectors_url);
        let telemetry = Telemetry::new(
            components.coordinator.clone(),
            components.tasks.clone(),
            &settings.activity_url,
            &settings.errors_url,
        );
        let (state, _) = watch::channel(PipelineState::Idle);
        Self {
            components,
            settings,
            mapper,
            selectors,
            telemetry,
            generation: AtomicU64::new(0),
            state,
        }
    }

    /// Follow state transitions of every run.
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        self.state.borrow().clone()
    }

    /// Fill the form in `tab`.
    pub async fn run(&self, tab: &TabId, options: RunOptions) -> Result<FillReport, PipelineError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let run_id = Uuid::new_v4();
        let span = info_span!("autofill_run", %run_id, generation);
        info!(parent: &span, "Autofill run {} started on tab {}", generation, tab);

        let mut stage = "scraping";
        let mut result = self
            .run_stages(tab, &options, generation, &mut stage)
            .instrument(span)
            .await;
        if let Ok(report) = &mut result {
            report.run_id = run_id;
        }
        match &result {
            Ok(report) => {
                self.transition(PipelineState::Completed {
                    filled: report.filled,
                });
                info!(
                    "Autofill run {} completed: {} filled in {} frame(s), {} failed",
                    generation,
                    report.filled,
                    report.frames,
                    report.failed_frames.len()
                );
                self.telemetry
                    .track_usage(options.page_url.as_deref(), report);
            }
            Err(PipelineError::Superseded) => {
                info!("Autofill run {} superseded before dispatch", generation);
            }
            Err(e) => {
                warn!("Autofill run {} failed while {}: {}", generation, stage, e);
                self.transition(PipelineState::Failed {
                    message: e.user_message(),
                });
                self.telemetry
                    .report_error(e, stage, options.page_url.as_deref());
            }
        }
        result
    }

    async fn run_stages(
        &self,
        tab: &TabId,
        options: &RunOptions,
        generation: u64,
        stage: &mut &'static str,
    ) -> Result<FillReport, PipelineError> {
        let scope = options
            .scope
            .clone()
            .unwrap_or_else(|| self.settings.scope.clone());

        *stage = "scraping";
        let fields = self.scrape(tab, &scope).await?;

        *stage = "context_loading";
        self.transition(PipelineState::ContextLoading);
        let context = self.components.context.load_context().await;
        if context.is_empty() {
            return Err(PipelineError::EmptyContext);
        }

        *stage = "mapping";
        let resolution = self.resolve(&fields, &context).await?;

        *stage = "merging_results";
        self.transition(PipelineState::MergingResults);
        if resolution.mappings.is_empty() {
            return Err(PipelineError::EmptyMapping);
        }
        let mut plan = DispatchPlan::build(&fields, &resolution.mappings, &context);
        debug!(
            "Dispatch plan: {} value(s) over {} frame(s), {} dropped by block caps",
            plan.value_count(),
            plan.frames.len(),
            plan.dropped_by_cap
        );
        let ats = options.ats();
        let hints = self
            .selectors
            .best_batch(&plan.dispatched_fingerprints(), ats.as_deref())
            .await;
        let selector_hints = plan.apply_selector_hints(&hints);

        if self.generation.load(Ordering::SeqCst) != generation {
            return Err(PipelineError::Superseded);
        }

        *stage = "dispatching";
        let outcomes = self.dispatch(tab, &plan, &scope).await;

        let mut report = aggregate(&outcomes);
        report.fields_scraped = fields.len();
        report.values_dispatched = plan.value_count();
        report.cache_hits = resolution.cache_hits;
        report.mapped = resolution.mapped;
        report.session_hit = resolution.session_hit;
        report.dropped_by_cap = plan.dropped_by_cap;
        report.selector_hints = selector_hints;
        report.unfilled_profile_keys = resolution.unfilled_profile_keys;
        Ok(report)
    }

    async fn scrape(&self, tab: &TabId, scope: &str) -> Result<Vec<FieldDescriptor>, PipelineError> {
        let request = ScrapeRequest {
            scope: scope.to_string(),
            expand_select_options: self.settings.expand_select_options,
            pre_expand_employment: false,
            pre_expand_education: false,
            max_education_blocks: None,
            max_employment_blocks: None,
        };
        let attempts = self.settings.scrape_attempts.max(1);
        let fields = scrape_with_retry(
            &self.components.frames,
            tab,
            &request,
            attempts,
            self.settings.scrape_backoff,
            |attempt| self.transition(PipelineState::Scraping { attempt }),
        )
        .await;

        if fields.is_empty() {
            return Err(PipelineError::NoFieldsFound { attempts });
        }
        Ok(fields)
    }

    /// Session tier, then durable tier, then the mapping service for misses.
    async fn resolve(
        &self,
        fields: &[FieldDescriptor],
        context: &AutofillContext,
    ) -> Result<Resolution, PipelineError> {
        self.transition(PipelineState::CacheResolving);
        let cache = &self.components.cache;

        let key = session_key(fields, context);
        if let Some(mappings) = cache.get_cached_mapping(&key) {
            debug!("Session cache hit for {} field(s)", fields.len());
            return Ok(Resolution {
                cache_hits: mappings.len(),
                mappings,
                mapped: 0,
                session_hit: true,
                unfilled_profile_keys: Vec::new(),
            });
        }

        let fingerprints = unique_fingerprints(fields);
        let hits = match cache.get_cached(&fingerprints).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Fingerprint cache unavailable, treating all fields as misses: {}", e);
                HashMap::new()
            }
        };
        let misses: Vec<FieldDescriptor> = fields
            .iter()
            .filter(|f| !hits.contains_key(&f.fingerprint))
            .cloned()
            .collect();
        debug!(
            "Fingerprint cache: {} hit(s), {} miss(es)",
            hits.len(),
            misses.len()
        );

        let cache_hits = hits.len();
        let mut mappings = hits;
        let mut unfilled_profile_keys = Vec::new();

        if !misses.is_empty() {
            self.transition(PipelineState::Mapping {
                misses: misses.len(),
            });
            let response = self.mapper.map_fields(&misses, context).await?;
            let fresh = mappings_for(&misses, &response);

            if let Err(e) = cache.set_cached(&fresh).await {
                warn!("Failed to cache {} mapping(s): {}", fresh.len(), e);
            }
            unfilled_profile_keys = response.unfilled_profile_keys.unwrap_or_default();
            if !unfilled_profile_keys.is_empty() {
                info!(
                    "Profile is missing values the form asks for: {}",
                    unfilled_profile_keys.join(", ")
                );
            }
            mappings.extend(fresh);
        }

        cache.set_cached_mapping(key, mappings.clone());
        Ok(Resolution {
            mappings,
            cache_hits,
            mapped: misses.len(),
            session_hit: false,
            unfilled_profile_keys,
        })
    }

    async fn dispatch(&self, tab: &TabId, plan: &DispatchPlan, scope: &str) -> Vec<FrameOutcome> {
        let resume = if plan.wants_resume() {
            match self.components.resumes.load_resume().await {
                Ok(resume) => resume,
                Err(e) => {
                    warn!("Stored résumé unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };

        self.transition(PipelineState::Dispatching {
            frames: plan.frames.len(),
        });
        self.components
            .frames
            .send_to_all_frames(tab, |frame| {
                FrameMessage::FillWithValues(plan.request_for(frame, scope, resume.as_ref()))
            })
            .await
    }

    fn transition(&self, next: PipelineState) {
        info!("Pipeline: {}", next);
        self.state.send_replace(next);
    }
}

fn unique_fingerprints(fields: &[FieldDescriptor]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    fields
        .iter()
        .filter(|f| !f.fingerprint.is_empty())
        .filter(|f| seen.insert(f.fingerprint.as_str()))
        .map(|f| f.fingerprint.clone())
        .collect()
}

/// Service results for `misses`, keyed by fingerprint.
fn mappings_for(misses: &[FieldDescriptor], response: &MappingResponse) -> Mappings {
    let mut fresh = Mappings::new();
    for field in misses {
        if fresh.contains_key(&field.fingerprint) {
            continue;
        }
        if let Some(result) = response.lookup(field) {
            fresh.insert(field.fingerprint.clone(), result.clone());
        }
    }
    fresh
}

/// Sum per-frame fill replies; failed frames only lower the totals.
fn aggregate(outcomes: &[FrameOutcome]) -> FillReport {
    let mut report = FillReport {
        frames: outcomes.len(),
        ..Default::default()
    };
    let mut failures: BTreeMap<FrameId, String> = BTreeMap::new();

    for outcome in outcomes {
        match outcome.decode::<FillResponse>() {
            Ok(response) => {
                report.filled += response.filled_count;
                report.resume_uploads += response.resume_upload_count;
                if !response.ok {
                    let error = response
                        .error
                        .unwrap_or_else(|| "collaborator reported failure".to_string());
                    failures.insert(outcome.frame_id, error);
                }
            }
            Err(e) => {
                let error = outcome.error_message().unwrap_or_else(|| e.to_string());
                failures.insert(outcome.frame_id, error);
            }
        }
    }

    report.failed_frames = failures
        .into_iter()
        .map(|(frame_id, error)| FrameFailure { frame_id, error })
        .collect();
    report
}
