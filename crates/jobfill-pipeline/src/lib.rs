//! # jobfill pipeline
//!
//! Drives one autofill run over every frame of a tab:
//!
//! ```text
//! Idle -> Scraping -> ContextLoading -> CacheResolving -> [Mapping]
//!      -> MergingResults -> Dispatching -> Completed
//! ```
//!
//! Any stage may end in `Failed`. Scraping retries with backoff, the
//! fingerprint cache short-circuits mapping, learned selectors are attached
//! to dispatched fields when the service has any, and per-frame failures
//! during dispatch only lower the totals of the [`FillReport`].

mod dispatch;
mod error;
mod feedback;
mod mapping;
mod pipeline;
mod scrape;
mod selectors;
mod state;
mod telemetry;

pub use dispatch::{DispatchPlan, FramePlan, RESUME_SENTINEL};
pub use error::PipelineError;
pub use feedback::{FeedbackReporter, SubmissionFeedback, SubmittedField};
pub use mapping::MappingClient;
pub use pipeline::{
    AutofillPipeline, FillReport, FrameFailure, PipelineComponents, PipelineSettings, RunOptions,
};
pub use scrape::{merge_frame_fields, scrape_with_retry};
pub use selectors::{detect_ats, selector_kind, SelectorClient, SelectorHint, SelectorHints};
pub use state::PipelineState;
pub use telemetry::Telemetry;
