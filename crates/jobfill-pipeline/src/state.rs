//! Pipeline states.

use std::fmt;

use serde::Serialize;

/// Where a pipeline run currently is.
///
/// `Mapping` is skipped when every fingerprint is cached. `Failed` is
/// reachable from any state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Idle,
    Scraping {
        attempt: u32,
    },
    ContextLoading,
    CacheResolving,
    Mapping {
        misses: usize,
    },
    MergingResults,
    Dispatching {
        frames: usize,
    },
    Completed {
        filled: usize,
    },
    Failed {
        message: String,
    },
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Completed { .. } | PipelineState::Failed { .. })
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::Scraping { attempt } => write!(f, "scraping (attempt {})", attempt),
            PipelineState::ContextLoading => write!(f, "context_loading"),
            PipelineState::CacheResolving => write!(f, "cache_resolving"),
            PipelineState::Mapping { misses } => write!(f, "mapping ({} misses)", misses),
            PipelineState::MergingResults => write!(f, "merging_results"),
            PipelineState::Dispatching { frames } => write!(f, "dispatching ({} frames)", frames),
            PipelineState::Completed { filled } => write!(f, "completed ({} filled)", filled),
            PipelineState::Failed { message } => write!(f, "failed: {}", message),
        }
    }
}
