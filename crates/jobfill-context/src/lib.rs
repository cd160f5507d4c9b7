//! # jobfill context
//!
//! Loads the user's autofill context (profile, saved answers, résumé
//! reference) and keeps the résumé binary on hand for upload fields.
//!
//! - [`ContextLoader`] - session flag, durable copy with a TTL, then the network
//! - [`ResumeVault`] - résumé bytes in the durable store
//! - [`BackgroundTasks`] - the single sink for best-effort side effects

mod error;
mod loader;
mod resume;
mod tasks;

pub use error::ContextError;
pub use loader::{ContextLoader, ContextSettings, CONTEXT_KEY};
pub use resume::{ResumeVault, RESUME_KEY};
pub use tasks::{BackgroundMetrics, BackgroundTasks};
