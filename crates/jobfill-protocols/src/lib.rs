//! # jobfill protocols
//!
//! Shared data model and collaborator contracts for the jobfill autofill engine.
//! Contains only types and interface definitions - no orchestration.
//!
//! ## Core Traits
//!
//! - [`FrameTransport`] - Delivers messages to the in-page collaborator of one frame
//! - [`DurableStore`] - Persistent key/value storage that survives sessions
//! - [`CredentialStore`] - Holds the single bearer token
//! - [`SessionSync`] - Exchanges tokens with other open sessions
//! - [`ResumeStore`] - Keeps the résumé binary for file uploads
//! - [`Clock`] - Wall clock used for durable timestamps

pub mod clock;
pub mod credential;
pub mod error;
pub mod message;
pub mod resume;
pub mod storage;
pub mod sync;
pub mod transport;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credential::CredentialStore;
pub use error::{CredentialError, FrameError, StorageError};
pub use message::{FillRequest, FillResponse, FrameMessage, ScrapeRequest, ScrapeResponse};
pub use resume::{ResumeData, ResumeStore};
pub use storage::{load_json, save_json, DurableStore};
pub use sync::SessionSync;
pub use transport::FrameTransport;
pub use types::*;
