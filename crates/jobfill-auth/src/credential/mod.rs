//! Token storage variants and startup selection.

mod keychain;
mod plaintext;

use std::sync::Arc;

use tracing::{info, warn};

use jobfill_config::CredentialBackend;
use jobfill_protocols::{CredentialError, CredentialStore, DurableStore};

pub use keychain::KeychainCredentialStore;
pub use plaintext::PlaintextCredentialStore;

/// Pick the credential store once at startup.
///
/// `Auto` tries the OS keychain with a read and falls back to the plaintext
/// store when the keychain is unusable on this machine.
pub async fn select_credential_store(
    backend: CredentialBackend,
    durable: Arc<dyn DurableStore>,
) -> Result<Arc<dyn CredentialStore>, CredentialError> {
    match backend {
        CredentialBackend::Plaintext => Ok(Arc::new(PlaintextCredentialStore::new(durable))),
        CredentialBackend::Keychain => {
            let store = KeychainCredentialStore::new()?;
            store.get_token().await?;
            info!("Using keychain credential store");
            Ok(Arc::new(store))
        }
        CredentialBackend::Auto => {
            let keychain = match KeychainCredentialStore::new() {
                Ok(store) => store.get_token().await.map(|_| store),
                Err(e) => Err(e),
            };
            match keychain {
                Ok(store) => {
                    info!("Using keychain credential store");
                    Ok(Arc::new(store))
                }
                Err(e) => {
                    warn!("Keychain unavailable ({}), storing token in plaintext", e);
                    Ok(Arc::new(PlaintextCredentialStore::new(durable)))
                }
            }
        }
    }
}
