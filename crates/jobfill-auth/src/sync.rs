//! Session sync implementations.

use async_trait::async_trait;

use jobfill_protocols::SessionSync;

/// Used when no browser is reachable, so no other session can be asked.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSessionSync;

#[async_trait]
impl SessionSync for NoopSessionSync {
    async fn fetch_token_from_open_tab(&self) -> Option<String> {
        None
    }

    async fn broadcast_token(&self, _token: &str) {}
}
