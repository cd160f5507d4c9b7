//! CdpFrameTransport against a scripted fake browser.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jobfill_frames::cdp::{CdpClient, CdpFrameTransport};
use jobfill_frames::FrameBroadcastChannel;
use jobfill_protocols::{FrameError, FrameId, FrameMessage, ScrapeRequest, TabId};

#[derive(Default)]
struct FakeBrowser {
    next_context: i64,
    contexts: HashMap<i64, String>,
    listening: HashSet<String>,
    injected: Vec<String>,
    attaches: usize,
}

impl FakeBrowser {
    fn respond(&mut self, req: &Value) -> Value {
        match req["method"].as_str().unwrap_or("") {
            "Target.attachToTarget" => {
                self.attaches += 1;
                json!({"sessionId": "S1"})
            }
            "Page.getFrameTree" => json!({
                "frameTree": {
                    "frame": {"id": "TOP", "url": "https://jobs.example.com/apply"},
                    "childFrames": [
                        {"frame": {"id": "CHILD", "parentId": "TOP", "url": "https://jobs.example.com/form"}}
                    ]
                }
            }),
            "Page.createIsolatedWorld" => {
                self.next_context += 1;
                let frame = req["params"]["frameId"].as_str().unwrap_or("").to_string();
                self.contexts.insert(self.next_context, frame);
                json!({"executionContextId": self.next_context})
            }
            "Runtime.evaluate" => {
                let context = req["params"]["contextId"].as_i64().unwrap_or(-1);
                let frame = self.contexts.get(&context).cloned().unwrap_or_default();
                let expression = req["params"]["expression"].as_str().unwrap_or("");
                if expression.contains("__jobfillNoListener") {
                    if self.listening.contains(&frame) {
                        json!({"result": {"type": "object", "value": {"ok": true, "frame": frame}}})
                    } else {
                        json!({"result": {"type": "object", "value": {"__jobfillNoListener": true}}})
                    }
                } else {
                    self.injected.push(frame.clone());
                    self.listening.insert(frame);
                    json!({"result": {"type": "undefined"}})
                }
            }
            _ => json!({}),
        }
    }
}

async fn start_fake_browser(state: Arc<Mutex<FakeBrowser>>) -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let state = state.clone();
            tokio::spawn(async move {
                let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                let (mut tx, mut rx) = ws.split();
                while let Some(Ok(Message::Text(text))) = rx.next().await {
                    let req: Value = serde_json::from_str(&text).unwrap();
                    let result = state.lock().respond(&req);
                    let reply = json!({"id": req["id"], "result": result});
                    if tx.send(Message::Text(reply.to_string().into())).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    let http = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Browser": "FakeChrome/1.0",
            "webSocketDebuggerUrl": format!("ws://{}/devtools/browser/fake", addr),
        })))
        .mount(&http)
        .await;
    Mock::given(method("GET"))
        .and(path("/json/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "PAGE-1", "type": "page", "title": "Apply", "url": "https://jobs.example.com/apply"},
            {"id": "WORKER-1", "type": "service_worker", "title": "", "url": "https://jobs.example.com/sw.js"}
        ])))
        .mount(&http)
        .await;
    http
}

fn scrape(_frame: FrameId) -> FrameMessage {
    FrameMessage::ScrapeFields(ScrapeRequest {
        scope: "all".to_string(),
        expand_select_options: true,
        pre_expand_employment: false,
        pre_expand_education: false,
        max_education_blocks: None,
        max_employment_blocks: None,
    })
}

fn browser_with_listener_in_top() -> Arc<Mutex<FakeBrowser>> {
    let state = FakeBrowser {
        listening: HashSet::from(["TOP".to_string()]),
        ..Default::default()
    };
    Arc::new(Mutex::new(state))
}

#[tokio::test]
async fn test_broadcast_injects_missing_collaborator() {
    let state = browser_with_listener_in_top();
    let http = start_fake_browser(state.clone()).await;

    let client = Arc::new(CdpClient::connect(&http.uri()).await.unwrap());
    let transport = CdpFrameTransport::new(
        client,
        vec!["window.__jobfill = { handle: async (m) => ({ ok: true }) };".to_string()],
    );
    let channel = FrameBroadcastChannel::new(Arc::new(transport));

    let outcomes = channel.send_to_all_frames(&TabId::new("PAGE-1"), scrape).await;
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.is_ok()));

    let child = outcomes.iter().find(|o| o.frame_id == FrameId(1)).unwrap();
    assert_eq!(child.result.as_ref().unwrap()["frame"], "CHILD");

    let state = state.lock();
    assert_eq!(state.injected, vec!["CHILD".to_string()]);
    assert_eq!(state.attaches, 1);
}

#[tokio::test]
async fn test_missing_scripts_fail_only_that_frame() {
    let state = browser_with_listener_in_top();
    let http = start_fake_browser(state.clone()).await;

    let client = Arc::new(CdpClient::connect(&http.uri()).await.unwrap());
    let channel = FrameBroadcastChannel::new(Arc::new(CdpFrameTransport::new(client, vec![])));

    let outcomes = channel.send_to_all_frames(&TabId::new("PAGE-1"), scrape).await;
    let top = outcomes.iter().find(|o| o.frame_id.is_top()).unwrap();
    let child = outcomes.iter().find(|o| o.frame_id == FrameId(1)).unwrap();
    assert!(top.is_ok());
    assert!(matches!(child.result, Err(FrameError::Injection { .. })));
}

#[tokio::test]
async fn test_find_page() {
    let http = start_fake_browser(browser_with_listener_in_top()).await;
    let client = CdpClient::connect(&http.uri()).await.unwrap();

    assert_eq!(client.find_page("PAGE-1").await.unwrap().id, "PAGE-1");
    assert_eq!(client.find_page("/apply").await.unwrap().id, "PAGE-1");
    assert!(client.find_page("sw.js").await.is_err());
}

#[tokio::test]
async fn test_connect_without_browser() {
    let http = MockServer::start().await;
    let result = CdpClient::connect(&http.uri()).await;
    assert!(result.is_err());
}
