//! # jobfill auth
//!
//! Keeps the single bearer token valid across a long multi-step fill.
//!
//! - [`TokenCoordinator`] builds auth headers, retries a request once after a
//!   401 and de-duplicates concurrent refreshes.
//! - [`endpoints::refresh_candidates`] derives the refresh URLs to try.
//! - [`credential`] holds the keychain and plaintext token stores.

pub mod coordinator;
pub mod credential;
pub mod endpoints;
pub mod error;
pub mod sync;

pub use coordinator::{AuthRequest, AuthSettings, TokenCoordinator};
pub use credential::{select_credential_store, KeychainCredentialStore, PlaintextCredentialStore};
pub use error::AuthError;
pub use sync::NoopSessionSync;
