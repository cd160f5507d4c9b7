//! [`SessionSync`] against open web-app tabs over CDP.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{debug, info};

use jobfill_protocols::SessionSync;

use super::client::CdpClient;
use super::error::CdpError;
use super::protocol::PageInfo;

/// Shares the bearer token with web-app pages open in the browser.
///
/// The web app keeps its token in `localStorage`; reading it from any open
/// page of the app and writing refreshed tokens back keeps both sides on
/// the same session.
pub struct CdpSessionSync {
    client: Arc<CdpClient>,
    app_prefix: String,
    storage_key: String,
    /// Flattened session per attached target.
    sessions: Mutex<HashMap<String, String>>,
}

impl CdpSessionSync {
    /// `app_prefix` is the URL prefix of web-app pages, e.g. `https://app.example.com`.
    pub fn new(
        client: Arc<CdpClient>,
        app_prefix: impl Into<String>,
        storage_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            app_prefix: app_prefix.into().trim_end_matches('/').to_string(),
            storage_key: storage_key.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Open pages that belong to the web app.
    pub async fn app_pages(&self) -> Result<Vec<PageInfo>, CdpError> {
        let pages = self.client.list_pages().await?;
        Ok(pages
            .into_iter()
            .filter(|p| is_app_page(&p.url, &self.app_prefix))
            .collect())
    }

    async fn session(&self, target_id: &str) -> Result<String, CdpError> {
        let cached = self.sessions.lock().get(target_id).cloned();
        if let Some(session) = cached {
            return Ok(session);
        }
        let session = self.client.attach(target_id).await?;
        self.sessions
            .lock()
            .insert(target_id.to_string(), session.clone());
        Ok(session)
    }

    async fn evaluate(&self, page: &PageInfo, expression: &str) -> Result<Value, CdpError> {
        let session = self.session(&page.id).await?;
        let result = self
            .client
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                })),
                Some(&session),
            )
            .await;

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                // The page may have closed; attach afresh next time.
                self.sessions.lock().remove(&page.id);
                return Err(e);
            }
        };
        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["text"].as_str().unwrap_or("Unknown error");
            return Err(CdpError::JavaScript(text.to_string()));
        }
        Ok(result["result"]["value"].clone())
    }

    /// Token stored by the web app in `page`, if any.
    pub async fn read_token(&self, page: &PageInfo) -> Result<Option<String>, CdpError> {
        let expression = read_expression(&self.storage_key)?;
        let value = self.evaluate(page, &expression).await?;
        Ok(value
            .as_str()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string))
    }

    /// Store `token` where the web app in `page` looks for it.
    pub async fn write_token(&self, page: &PageInfo, token: &str) -> Result<(), CdpError> {
        let expression = write_expression(&self.storage_key, token)?;
        match self.evaluate(page, &expression).await? {
            Value::Bool(true) => Ok(()),
            _ => Err(CdpError::JavaScript(
                "localStorage is not writable".to_string(),
            )),
        }
    }
}

#[async_trait]
impl SessionSync for CdpSessionSync {
    async fn fetch_token_from_open_tab(&self) -> Option<String> {
        let pages = match self.app_pages().await {
            Ok(pages) => pages,
            Err(e) => {
                debug!("Cannot list pages for token sync: {}", e);
                return None;
            }
        };
        for page in &pages {
            match self.read_token(page).await {
                Ok(Some(token)) => {
                    debug!("Read token from open session {} ({} chars)", page.id, token.len());
                    return Some(token);
                }
                Ok(None) => debug!("Open session {} holds no token", page.id),
                Err(e) => debug!("Cannot read token from {}: {}", page.id, e),
            }
        }
        None
    }

    async fn broadcast_token(&self, token: &str) {
        let pages = match self.app_pages().await {
            Ok(pages) => pages,
            Err(e) => {
                debug!("Cannot list pages for token sync: {}", e);
                return;
            }
        };
        let mut synced = 0;
        for page in &pages {
            match self.write_token(page, token).await {
                Ok(()) => synced += 1,
                Err(e) => debug!("Cannot write token to {}: {}", page.id, e),
            }
        }
        if synced > 0 {
            info!("Refreshed token shared with {} open session(s)", synced);
        }
    }
}

/// `url` is `prefix` itself or a path, query or fragment below it.
fn is_app_page(url: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    match url.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(['/', '?', '#']),
        None => false,
    }
}

fn read_expression(key: &str) -> Result<String, serde_json::Error> {
    let key = serde_json::to_string(key)?;
    Ok(format!(
        "(() => {{ try {{ return window.localStorage.getItem({key}); }} catch (e) {{ return null; }} }})()"
    ))
}

fn write_expression(key: &str, token: &str) -> Result<String, serde_json::Error> {
    let key = serde_json::to_string(key)?;
    let token = serde_json::to_string(token)?;
    Ok(format!(
        "(() => {{ try {{ window.localStorage.setItem({key}, {token}); \
         window.dispatchEvent(new StorageEvent('storage', {{ key: {key}, newValue: {token} }})); \
         return true; }} catch (e) {{ return false; }} }})()"
    ))
}
