use super::*;
use crate::credential::PlaintextCredentialStore;
use crate::sync::NoopSessionSync;
use async_trait::async_trait;
use jobfill_protocols::DurableStore;
use jobfill_storage::MemoryStore;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingSync {
    offer: Option<String>,
    delay: Option<Duration>,
    broadcast_delay: Option<Duration>,
    broadcasts: Mutex<Vec<String>>,
}

#[async_trait]
impl SessionSync for RecordingSync {
    async fn fetch_token_from_open_tab(&self) -> Option<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.offer.clone()
    }

    async fn broadcast_token(&self, token: &str) {
        if let Some(delay) = self.broadcast_delay {
            tokio::time::sleep(delay).await;
        }
        self.broadcasts.lock().push(token.to_string());
    }
}

fn settings(base_url: String) -> AuthSettings {
    AuthSettings {
        base_url,
        alternate_local_ports: vec![],
        sync_timeout: Duration::from_millis(100),
        request_timeout: Duration::from_secs(5),
    }
}

async fn coordinator_with(
    base_url: String,
    token: Option<&str>,
    sync: Arc<dyn SessionSync>,
) -> (TokenCoordinator, Arc<MemoryStore>) {
    let durable = Arc::new(MemoryStore::new());
    let credentials = Arc::new(PlaintextCredentialStore::new(durable.clone()));
    if let Some(token) = token {
        credentials.store_token(token).await.unwrap();
    }
    let coordinator = TokenCoordinator::new(settings(base_url), credentials, sync).unwrap();
    (coordinator, durable)
}

async fn coordinator(server: &MockServer, token: Option<&str>) -> (TokenCoordinator, Arc<MemoryStore>) {
    coordinator_with(format!("{}/api", server.uri()), token, Arc::new(NoopSessionSync)).await
}

async fn stored_token(durable: &MemoryStore) -> Option<Value> {
    durable.get("accessToken").await.unwrap()
}

#[tokio::test]
async fn test_request_uses_stored_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/data"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (coordinator, _) = coordinator(&server, Some("tok-1")).await;
    let response = coordinator
        .fetch_with_auth_retry(AuthRequest::get(format!("{}/api/data", server.uri())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_401_refreshes_and_retries_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/data"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "new"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/data"))
        .and(header("authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let (coordinator, durable) = coordinator(&server, Some("old")).await;
    let response = coordinator
        .fetch_with_auth_retry(AuthRequest::post_json(
            format!("{}/api/data", server.uri()),
            json!({"q": 1}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(coordinator.current_token().await.as_deref(), Some("new"));
    assert_eq!(stored_token(&durable).await, Some(json!("new")));
}

#[tokio::test]
async fn test_failed_refresh_returns_original_401() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let (coordinator, durable) = coordinator(&server, Some("old")).await;
    let response = coordinator
        .fetch_with_auth_retry(AuthRequest::get(format!("{}/api/data", server.uri())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(stored_token(&durable).await, Some(json!("old")));
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/data"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "new"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/data"))
        .and(header("authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let (coordinator, _) = coordinator(&server, Some("old")).await;
    let url = format!("{}/api/data", server.uri());
    let (a, b) = tokio::join!(
        coordinator.fetch_with_auth_retry(AuthRequest::get(url.clone())),
        coordinator.fetch_with_auth_retry(AuthRequest::get(url.clone())),
    );

    assert_eq!(a.unwrap().status(), StatusCode::OK);
    assert_eq!(b.unwrap().status(), StatusCode::OK);
    assert_eq!(coordinator.current_token().await.as_deref(), Some("new"));
}

#[tokio::test]
async fn test_concurrent_refresh_calls_observe_same_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&server)
        .await;

    let (coordinator, _) = coordinator(&server, Some("old")).await;
    let (a, b) = tokio::join!(coordinator.refresh_token(), coordinator.refresh_token());
    assert_eq!(a, None);
    assert_eq!(b, None);
}

#[tokio::test]
async fn test_late_401_after_failed_refresh_does_not_refresh_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/fast"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/slow"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_millis(50)))
        .expect(1)
        .mount(&server)
        .await;

    let (coordinator, _) = coordinator(&server, Some("old")).await;
    let (fast, slow) = tokio::join!(
        coordinator.fetch_with_auth_retry(AuthRequest::get(format!("{}/api/fast", server.uri()))),
        coordinator.fetch_with_auth_retry(AuthRequest::get(format!("{}/api/slow", server.uri()))),
    );

    assert_eq!(fast.unwrap().status(), StatusCode::UNAUTHORIZED);
    assert_eq!(slow.unwrap().status(), StatusCode::UNAUTHORIZED);
    assert_eq!(coordinator.current_token().await.as_deref(), Some("old"));
}

#[tokio::test]
async fn test_new_token_allows_refresh_after_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let (coordinator, _) = coordinator(&server, Some("old")).await;
    let url = format!("{}/api/data", server.uri());
    coordinator.fetch_with_auth_retry(AuthRequest::get(url.clone())).await.unwrap();

    coordinator.set_token("pasted").await.unwrap();
    let response = coordinator.fetch_with_auth_retry(AuthRequest::get(url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_falls_back_to_base_without_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "fresh"})))
        .expect(1)
        .mount(&server)
        .await;

    let (coordinator, _) = coordinator(&server, Some("old")).await;
    assert_eq!(coordinator.refresh_token().await.as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_refresh_without_token_makes_no_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let (coordinator, _) = coordinator(&server, None).await;
    assert_eq!(coordinator.refresh_token().await, None);
}

#[tokio::test]
async fn test_refresh_broadcasts_new_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "new"})))
        .mount(&server)
        .await;

    let sync = Arc::new(RecordingSync::default());
    let (coordinator, _) =
        coordinator_with(format!("{}/api", server.uri()), Some("old"), sync.clone()).await;
    coordinator.refresh_token().await;
    assert_eq!(*sync.broadcasts.lock(), vec!["new".to_string()]);
}

#[tokio::test]
async fn test_stalled_session_does_not_hold_up_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "new"})))
        .expect(1)
        .mount(&server)
        .await;

    let sync = Arc::new(RecordingSync {
        broadcast_delay: Some(Duration::from_secs(30)),
        ..Default::default()
    });
    let (coordinator, _) =
        coordinator_with(format!("{}/api", server.uri()), Some("old"), sync.clone()).await;

    let refreshed = tokio::time::timeout(Duration::from_secs(5), coordinator.refresh_token())
        .await
        .expect("refresh waited on the stalled session");
    assert_eq!(refreshed.as_deref(), Some("new"));
    assert!(sync.broadcasts.lock().is_empty());
}

#[tokio::test]
async fn test_token_from_open_session_wins() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/data"))
        .and(header("authorization", "Bearer synced"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let sync = Arc::new(RecordingSync {
        offer: Some("synced".to_string()),
        ..Default::default()
    });
    let (coordinator, durable) =
        coordinator_with(format!("{}/api", server.uri()), Some("stored"), sync).await;
    let response = coordinator
        .fetch_with_auth_retry(AuthRequest::get(format!("{}/api/data", server.uri())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(stored_token(&durable).await, Some(json!("synced")));
}

#[tokio::test(start_paused = true)]
async fn test_slow_session_sync_falls_back_to_store() {
    let sync = Arc::new(RecordingSync {
        offer: Some("too-late".to_string()),
        delay: Some(Duration::from_secs(10)),
        ..Default::default()
    });
    let (coordinator, _) =
        coordinator_with("http://localhost:8000/api".to_string(), Some("stored"), sync).await;

    let headers = coordinator.auth_headers().await;
    assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer stored");
    assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
}

#[tokio::test]
async fn test_headers_without_token() {
    let (coordinator, _) = coordinator_with(
        "http://localhost:8000/api".to_string(),
        None,
        Arc::new(NoopSessionSync),
    )
    .await;
    let headers = coordinator.auth_headers().await;
    assert!(headers.get(AUTHORIZATION).is_none());
}

#[tokio::test]
async fn test_set_and_clear_token() {
    let (coordinator, durable) = coordinator_with(
        "http://localhost:8000/api".to_string(),
        None,
        Arc::new(NoopSessionSync),
    )
    .await;
    coordinator.set_token("manual").await.unwrap();
    assert_eq!(coordinator.current_token().await.as_deref(), Some("manual"));
    assert_eq!(stored_token(&durable).await, Some(json!("manual")));

    coordinator.clear_token().await.unwrap();
    assert_eq!(coordinator.current_token().await, None);
}

#[test]
fn test_empty_base_url_rejected() {
    let result = TokenCoordinator::new(
        settings(String::new()),
        Arc::new(PlaintextCredentialStore::new(Arc::new(MemoryStore::new()))),
        Arc::new(NoopSessionSync),
    );
    assert!(matches!(result, Err(AuthError::InvalidUrl(_))));
}
