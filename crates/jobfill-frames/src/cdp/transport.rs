//! [`FrameTransport`] over CDP.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{debug, trace};

use jobfill_protocols::{FrameError, FrameId, FrameMessage, FrameTransport, TabId};

use super::client::CdpClient;
use super::error::CdpError;
use super::protocol::FrameTree;
use super::registry::FrameRegistry;

const WORLD_NAME: &str = "jobfill";
const NO_LISTENER_MARKER: &str = "__jobfillNoListener";

/// Read collaborator script sources from disk.
pub async fn load_scripts(paths: &[PathBuf]) -> std::io::Result<Vec<String>> {
    let mut scripts = Vec::with_capacity(paths.len());
    for path in paths {
        scripts.push(tokio::fs::read_to_string(path).await?);
    }
    Ok(scripts)
}

#[derive(Default)]
struct TabState {
    session_id: Option<String>,
    frames: FrameRegistry,
    /// Isolated world execution context per frame.
    worlds: HashMap<FrameId, i64>,
}

/// Reaches `window.__jobfill` in each frame's isolated world.
pub struct CdpFrameTransport {
    client: Arc<CdpClient>,
    scripts: Vec<String>,
    tabs: Mutex<HashMap<TabId, TabState>>,
    attach_lock: tokio::sync::Mutex<()>,
}

impl CdpFrameTransport {
    pub fn new(client: Arc<CdpClient>, scripts: Vec<String>) -> Self {
        Self {
            client,
            scripts,
            tabs: Mutex::new(HashMap::new()),
            attach_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn cached_session(&self, tab: &TabId) -> Option<String> {
        self.tabs
            .lock()
            .get(tab)
            .and_then(|state| state.session_id.clone())
    }

    async fn session(&self, tab: &TabId) -> Result<String, CdpError> {
        if let Some(session) = self.cached_session(tab) {
            return Ok(session);
        }
        let _guard = self.attach_lock.lock().await;
        if let Some(session) = self.cached_session(tab) {
            return Ok(session);
        }
        let session = self.client.attach(tab.as_str()).await?;
        self.tabs.lock().entry(tab.clone()).or_default().session_id = Some(session.clone());
        Ok(session)
    }

    async fn scan_frames(&self, tab: &TabId) -> Result<Vec<FrameId>, CdpError> {
        let session = self.session(tab).await?;
        let result = self
            .client
            .call("Page.getFrameTree", None, Some(&session))
            .await?;
        let tree: FrameTree = serde_json::from_value(result["frameTree"].clone())?;

        let mut tabs = self.tabs.lock();
        let state = tabs.entry(tab.clone()).or_default();
        Ok(state.frames.scan(&tree))
    }

    async fn cdp_frame_id(&self, tab: &TabId, frame: FrameId) -> Result<String, FrameError> {
        let known = |this: &Self| {
            this.tabs
                .lock()
                .get(tab)
                .and_then(|state| state.frames.cdp_id(frame).map(str::to_string))
        };
        if let Some(id) = known(self) {
            return Ok(id);
        }
        self.scan_frames(tab)
            .await
            .map_err(|e| e.into_frame_error(frame))?;
        known(self).ok_or_else(|| FrameError::Unreachable {
            frame,
            message: "frame no longer exists".to_string(),
        })
    }

    async fn world(&self, tab: &TabId, frame: FrameId, fresh: bool) -> Result<i64, FrameError> {
        if !fresh {
            let cached = self
                .tabs
                .lock()
                .get(tab)
                .and_then(|state| state.worlds.get(&frame).copied());
            if let Some(context_id) = cached {
                return Ok(context_id);
            }
        }

        let cdp_frame = self.cdp_frame_id(tab, frame).await?;
        let session = self
            .session(tab)
            .await
            .map_err(|e| e.into_frame_error(frame))?;
        let result = self
            .client
            .call(
                "Page.createIsolatedWorld",
                Some(json!({
                    "frameId": cdp_frame,
                    "worldName": WORLD_NAME,
                    "grantUniveralAccess": true,
                })),
                Some(&session),
            )
            .await
            .map_err(|e| FrameError::Unreachable {
                frame,
                message: e.to_string(),
            })?;
        let context_id = result["executionContextId"]
            .as_i64()
            .ok_or_else(|| FrameError::InvalidResponse {
                frame,
                message: "Missing executionContextId".to_string(),
            })?;

        debug!("Created isolated world {} for frame {}", context_id, frame);
        self.tabs
            .lock()
            .entry(tab.clone())
            .or_default()
            .worlds
            .insert(frame, context_id);
        Ok(context_id)
    }

    fn forget_world(&self, tab: &TabId, frame: FrameId) {
        if let Some(state) = self.tabs.lock().get_mut(tab) {
            state.worlds.remove(&frame);
        }
    }

    async fn evaluate(
        &self,
        tab: &TabId,
        context_id: i64,
        expression: &str,
    ) -> Result<Value, CdpError> {
        let session = self.session(tab).await?;
        let result = self
            .client
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "contextId": context_id,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
                Some(&session),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["exception"]["description"]
                .as_str()
                .or_else(|| exception["text"].as_str())
                .unwrap_or("Unknown error");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }
}

/// Expression that hands `message` to the collaborator, or reports its absence.
pub(crate) fn delivery_expression(message: &FrameMessage) -> Result<String, serde_json::Error> {
    let payload = serde_json::to_string(message)?;
    Ok(format!(
        "(async () => {{ const h = window.__jobfill; \
         if (!h || typeof h.handle !== 'function') return {{ {marker}: true }}; \
         return await h.handle({payload}); }})()",
        marker = NO_LISTENER_MARKER,
        payload = payload,
    ))
}

/// Turn the evaluated value into a delivery result.
pub(crate) fn interpret_reply(frame: FrameId, value: Value) -> Result<Value, FrameError> {
    if value.get(NO_LISTENER_MARKER).and_then(Value::as_bool) == Some(true) {
        return Err(FrameError::NoListener(frame));
    }
    if value.is_null() {
        return Err(FrameError::InvalidResponse {
            frame,
            message: "collaborator returned no reply".to_string(),
        });
    }
    Ok(value)
}

#[async_trait]
impl FrameTransport for CdpFrameTransport {
    async fn frames(&self, tab: &TabId) -> Result<Vec<FrameId>, FrameError> {
        self.scan_frames(tab)
            .await
            .map_err(|e| FrameError::Enumeration(e.to_string()))
    }

    async fn deliver(
        &self,
        tab: &TabId,
        frame: FrameId,
        message: &FrameMessage,
    ) -> Result<Value, FrameError> {
        let expression = delivery_expression(message).map_err(|e| FrameError::InvalidResponse {
            frame,
            message: e.to_string(),
        })?;
        let context_id = self.world(tab, frame, false).await?;
        trace!("Delivering {} to frame {}", message.kind(), frame);

        match self.evaluate(tab, context_id, &expression).await {
            Ok(value) => interpret_reply(frame, value),
            // The world went away with a navigation; a fresh one needs the scripts again.
            Err(CdpError::Protocol { message: reason, .. }) => {
                debug!("Isolated world of frame {} is gone: {}", frame, reason);
                self.forget_world(tab, frame);
                Err(FrameError::NoListener(frame))
            }
            Err(e) => Err(e.into_frame_error(frame)),
        }
    }

    async fn inject(&self, tab: &TabId, frame: FrameId) -> Result<(), FrameError> {
        if self.scripts.is_empty() {
            return Err(FrameError::Injection {
                frame,
                message: "no collaborator scripts configured".to_string(),
            });
        }

        let context_id = self.world(tab, frame, true).await?;
        for script in &self.scripts {
            self.evaluate(tab, context_id, script)
                .await
                .map_err(|e| FrameError::Injection {
                    frame,
                    message: e.to_string(),
                })?;
        }
        debug!("Injected {} script(s) into frame {}", self.scripts.len(), frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobfill_protocols::ScrapeRequest;

    fn scrape() -> FrameMessage {
        FrameMessage::ScrapeFields(ScrapeRequest {
            scope: "all".to_string(),
            expand_select_options: false,
            pre_expand_employment: false,
            pre_expand_education: false,
            max_education_blocks: None,
            max_employment_blocks: None,
        })
    }

    #[test]
    fn test_delivery_expression_embeds_message() {
        let expression = delivery_expression(&scrape()).unwrap();
        assert!(expression.contains("window.__jobfill"));
        assert!(expression.contains(r#""type":"SCRAPE_FIELDS""#));
        assert!(expression.contains(NO_LISTENER_MARKER));
    }

    #[test]
    fn test_interpret_no_listener() {
        let result = interpret_reply(FrameId(1), json!({ (NO_LISTENER_MARKER): true }));
        assert!(matches!(result, Err(FrameError::NoListener(FrameId(1)))));
    }

    #[test]
    fn test_interpret_null_reply() {
        let result = interpret_reply(FrameId(0), Value::Null);
        assert!(matches!(result, Err(FrameError::InvalidResponse { .. })));
    }

    #[test]
    fn test_interpret_reply_passthrough() {
        let value = json!({"ok": true, "fields": []});
        assert_eq!(interpret_reply(FrameId(0), value.clone()).unwrap(), value);
    }

    #[tokio::test]
    async fn test_load_scripts() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("content.js");
        std::fs::write(&path, "window.__jobfill = {};").unwrap();

        let scripts = load_scripts(&[path]).await.unwrap();
        assert_eq!(scripts, vec!["window.__jobfill = {};".to_string()]);
        assert!(load_scripts(&[dir.path().join("missing.js")]).await.is_err());
    }
}
