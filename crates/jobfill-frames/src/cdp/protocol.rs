//! CDP protocol types and message definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CDP request message.
#[derive(Debug, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// CDP response or event message.
#[derive(Debug, Deserialize)]
pub struct CdpResponse {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<CdpErrorResponse>,
    pub method: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// CDP error in response.
#[derive(Debug, Deserialize)]
pub struct CdpErrorResponse {
    pub code: i64,
    pub message: String,
}

/// Page info from the `/json/list` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub page_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

/// Browser version info.
///
/// Chrome returns PascalCase field names for this endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser", default)]
    pub browser: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

/// One frame as reported by `Page.getFrameTree`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInfo {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub url: String,
}

/// Result of `Page.getFrameTree`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameTree {
    pub frame: FrameInfo,
    #[serde(default)]
    pub child_frames: Vec<FrameTree>,
}

impl FrameTree {
    /// All frames, parents before children, document order.
    pub fn flatten(&self) -> Vec<&FrameInfo> {
        let mut out = vec![&self.frame];
        for child in &self.child_frames {
            out.extend(child.flatten());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let req = CdpRequest {
            id: 7,
            method: "Page.getFrameTree".to_string(),
            params: None,
            session_id: Some("S1".to_string()),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["sessionId"], "S1");
        assert!(json.get("params").is_none());
    }

    #[test]
    fn test_frame_tree_flatten() {
        let tree: FrameTree = serde_json::from_value(json!({
            "frame": {"id": "TOP", "url": "https://jobs.example.com"},
            "childFrames": [
                {
                    "frame": {"id": "A", "parentId": "TOP", "url": "https://boards.example.com"},
                    "childFrames": [{"frame": {"id": "A1", "parentId": "A"}}]
                },
                {"frame": {"id": "B", "parentId": "TOP"}}
            ]
        }))
        .unwrap();

        let ids: Vec<&str> = tree.flatten().iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["TOP", "A", "A1", "B"]);
        assert_eq!(tree.child_frames[0].frame.parent_id.as_deref(), Some("TOP"));
    }

    #[test]
    fn test_error_response() {
        let resp: CdpResponse = serde_json::from_value(json!({
            "id": 3,
            "error": {"code": -32000, "message": "Cannot find context with specified id"}
        }))
        .unwrap();
        assert_eq!(resp.id, Some(3));
        assert_eq!(resp.error.unwrap().code, -32000);
    }
}
