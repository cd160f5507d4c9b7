//! Token refresh coordination.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use jobfill_config::Config;
use jobfill_protocols::{CredentialStore, SessionSync};

use crate::endpoints::refresh_candidates;
use crate::error::AuthError;

type PendingRefresh = Shared<BoxFuture<'static, Option<String>>>;

/// Settings for [`TokenCoordinator`].
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub base_url: String,
    pub alternate_local_ports: Vec<u16>,
    pub sync_timeout: Duration,
    pub request_timeout: Duration,
}

impl AuthSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.api.base_url.clone(),
            alternate_local_ports: config.auth.alternate_local_ports.clone(),
            sync_timeout: Duration::from_millis(config.auth.sync_timeout_ms),
            request_timeout: config.api.timeout(),
        }
    }
}

/// A request that can be replayed after a token refresh.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

impl AuthRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            body: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body: Some(body),
        }
    }
}

#[derive(Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access_token: String,
}

/// Owner of the session's bearer token.
///
/// Cloning is cheap; all clones share the token and the refresh guard.
#[derive(Clone)]
pub struct TokenCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    candidates: Vec<String>,
    credentials: Arc<dyn CredentialStore>,
    sync: Arc<dyn SessionSync>,
    sync_timeout: Duration,
    token: RwLock<Option<String>>,
    pending: Mutex<Option<PendingRefresh>>,
    /// Token whose refresh last failed; a later 401 carrying it gives up at once.
    failed_for: Mutex<Option<String>>,
}

impl TokenCoordinator {
    pub fn new(
        settings: AuthSettings,
        credentials: Arc<dyn CredentialStore>,
        sync: Arc<dyn SessionSync>,
    ) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        let candidates = refresh_candidates(&settings.base_url, &settings.alternate_local_ports);
        if candidates.is_empty() {
            return Err(AuthError::InvalidUrl(settings.base_url));
        }
        debug!("Token refresh candidates: {:?}", candidates);

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                candidates,
                credentials,
                sync,
                sync_timeout: settings.sync_timeout,
                token: RwLock::new(None),
                pending: Mutex::new(None),
                failed_for: Mutex::new(None),
            }),
        })
    }

    /// Shared HTTP client, for callers that do not need auth.
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    /// The best token available right now, without refreshing.
    ///
    /// Asks open sessions first, then memory, then the credential store.
    pub async fn auth_token(&self) -> Option<String> {
        let synced = tokio::time::timeout(
            self.inner.sync_timeout,
            self.inner.sync.fetch_token_from_open_tab(),
        )
        .await
        .ok()
        .flatten()
        .filter(|t| !t.is_empty());

        if let Some(token) = synced {
            let changed = self.inner.token.read().as_deref() != Some(token.as_str());
            if changed {
                debug!("Adopted token from open session ({} chars)", token.len());
                self.inner.adopt(&token).await;
            }
            return Some(token);
        }

        self.inner.current_token().await
    }

    /// Headers for an authenticated JSON request.
    pub async fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = self.auth_token().await {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("Stored token is not a valid header value, sending without auth"),
            }
        }
        headers
    }

    /// Send `request`; on 401 refresh once and replay it with the new token.
    ///
    /// When no new token can be obtained the original 401 response is returned.
    pub async fn fetch_with_auth_retry(&self, request: AuthRequest) -> Result<Response, AuthError> {
        let token = self.auth_token().await;
        let response = self.send(&request, token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!("{} {} returned 401", request.method, request.url);
        let Some(fresh) = self.refresh_after_unauthorized(token.as_deref()).await else {
            return Ok(response);
        };

        debug!("Retrying {} {} with refreshed token", request.method, request.url);
        self.send(&request, Some(&fresh)).await
    }

    /// Refresh the token, joining a refresh already in flight.
    pub async fn refresh_token(&self) -> Option<String> {
        let shared = {
            let mut pending = self.inner.pending.lock();
            match pending.as_ref() {
                Some(in_flight) => in_flight.clone(),
                None => {
                    let inner = Arc::clone(&self.inner);
                    let refresh = async move {
                        let result = inner.refresh_via_api().await;
                        inner.pending.lock().take();
                        result
                    }
                    .boxed()
                    .shared();
                    *pending = Some(refresh.clone());
                    refresh
                }
            }
        };
        shared.await
    }

    /// Replace the token in memory and in the credential store.
    pub async fn set_token(&self, token: &str) -> Result<(), AuthError> {
        *self.inner.token.write() = Some(token.to_string());
        self.inner.failed_for.lock().take();
        self.inner.credentials.store_token(token).await?;
        Ok(())
    }

    pub async fn clear_token(&self) -> Result<(), AuthError> {
        self.inner.token.write().take();
        self.inner.failed_for.lock().take();
        self.inner.credentials.clear().await?;
        Ok(())
    }

    /// Token from memory or the credential store.
    pub async fn current_token(&self) -> Option<String> {
        self.inner.current_token().await
    }

    /// A 401 seen with `stale` belongs to an episode that may already be over:
    /// if the token moved on since, reuse it instead of refreshing again, and
    /// if a refresh already failed for `stale`, share that failure.
    async fn refresh_after_unauthorized(&self, stale: Option<&str>) -> Option<String> {
        let current = self.inner.token.read().clone();
        if let Some(current) = current {
            if Some(current.as_str()) != stale {
                return Some(current);
            }
        }
        if stale.is_some() && self.inner.failed_for.lock().as_deref() == stale {
            debug!("Refresh already failed for this token, not retrying");
            return None;
        }

        let fresh = self.refresh_token().await;
        if fresh.is_none() {
            if let Some(stale) = stale {
                let still_stale = self.inner.token.read().as_deref() == Some(stale);
                if still_stale {
                    *self.inner.failed_for.lock() = Some(stale.to_string());
                }
            }
        }
        fresh
    }

    async fn send(&self, request: &AuthRequest, token: Option<&str>) -> Result<Response, AuthError> {
        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), &request.url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }
}

impl Inner {
    async fn current_token(&self) -> Option<String> {
        let cached = self.token.read().clone();
        if cached.is_some() {
            return cached;
        }
        match self.credentials.get_token().await {
            Ok(Some(token)) => {
                *self.token.write() = Some(token.clone());
                Some(token)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read token from {} store: {}", self.credentials.kind(), e);
                None
            }
        }
    }

    /// Memory first, then the store; a store failure only costs persistence.
    async fn adopt(&self, token: &str) {
        *self.token.write() = Some(token.to_string());
        self.failed_for.lock().take();
        if let Err(e) = self.credentials.store_token(token).await {
            warn!("Failed to persist token to {} store: {}", self.credentials.kind(), e);
        }
    }

    async fn refresh_via_api(&self) -> Option<String> {
        let Some(old) = self.current_token().await else {
            debug!("No token to refresh from");
            return None;
        };

        for url in &self.candidates {
            let response = match self.http.post(url).bearer_auth(&old).send().await {
                Ok(response) => response,
                Err(e) => {
                    debug!("Refresh endpoint {} unreachable: {}", url, e);
                    continue;
                }
            };
            if !response.status().is_success() {
                debug!("Refresh endpoint {} returned {}", url, response.status());
                continue;
            }
            match response.json::<RefreshResponse>().await {
                Ok(body) if !body.access_token.is_empty() => {
                    let token = body.access_token;
                    self.adopt(&token).await;
                    let shared = tokio::time::timeout(
                        self.sync_timeout,
                        self.sync.broadcast_token(&token),
                    )
                    .await;
                    if shared.is_err() {
                        debug!("Open sessions did not take the refreshed token in time");
                    }
                    info!("Access token refreshed via {}", url);
                    return Some(token);
                }
                Ok(_) => warn!("Refresh endpoint {} returned no access_token", url),
                Err(e) => warn!("Refresh endpoint {} returned an unreadable body: {}", url, e),
            }
        }

        warn!(
            "Token refresh failed on all {} endpoints",
            self.candidates.len()
        );
        None
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
