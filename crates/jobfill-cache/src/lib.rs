//! # jobfill cache
//!
//! Field fingerprints and the two-tier mapping cache.
//!
//! - The durable tier maps one fingerprint to one mapping, lives in the
//!   durable store and expires after a week.
//! - The session tier maps a whole request signature to the merged mapping
//!   set, lives in process memory and expires after minutes.

use std::collections::HashMap;

use jobfill_protocols::MappingResult;

mod cache;
pub mod durable;
mod error;
pub mod fingerprint;
mod key;
mod session;

pub use cache::{CacheStats, FingerprintCache};
pub use durable::{CacheEntry, DurableFingerprintCache, DurableSettings, DURABLE_CACHE_KEY};
pub use error::CacheError;
pub use fingerprint::{compute_fingerprint, ensure_fingerprints, normalize_label};
pub use key::session_key;
pub use session::SessionMappingCache;

/// Fingerprint to mapping.
pub type Mappings = HashMap<String, MappingResult>;
