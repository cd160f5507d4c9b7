//! Cross-session token exchange.

use async_trait::async_trait;

/// Talks to other open sessions of the web app that may hold a fresher token.
#[async_trait]
pub trait SessionSync: Send + Sync {
    /// `FETCH_TOKEN_FROM_OPEN_TAB`: ask an open session for its token.
    async fn fetch_token_from_open_tab(&self) -> Option<String>;

    /// `SYNC_TOKEN_TO_HIREMATE_TAB`: push a refreshed token to open sessions.
    async fn broadcast_token(&self, token: &str);
}
