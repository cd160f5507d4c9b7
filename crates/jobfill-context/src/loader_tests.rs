use super::*;
use crate::resume::ResumeVault;
use jobfill_auth::{AuthSettings, NoopSessionSync, PlaintextCredentialStore};
use jobfill_protocols::{CredentialStore, ManualClock};
use jobfill_storage::MemoryStore;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONTEXT_PATH: &str = "/api/chrome-extension/autofill/context";
const MINUTE: i64 = 60_000;

struct Harness {
    loader: ContextLoader,
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    tasks: BackgroundTasks,
    vault: Arc<ResumeVault>,
}

async fn harness(server: &MockServer) -> Harness {
    let base_url = format!("{}/api", server.uri());
    let store = Arc::new(MemoryStore::new());
    let credentials = Arc::new(PlaintextCredentialStore::new(store.clone()));
    credentials.store_token("token-1").await.unwrap();

    let coordinator = TokenCoordinator::new(
        AuthSettings {
            base_url: base_url.clone(),
            alternate_local_ports: vec![],
            sync_timeout: Duration::from_millis(50),
            request_timeout: Duration::from_secs(5),
        },
        credentials,
        Arc::new(NoopSessionSync),
    )
    .unwrap();

    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let tasks = BackgroundTasks::new();
    let vault = Arc::new(ResumeVault::new(store.clone()));
    let settings = ContextSettings {
        context_url: format!("{}/chrome-extension/autofill/context", base_url),
        base_url,
        ttl_millis: 10 * MINUTE,
    };
    let loader = ContextLoader::new(
        coordinator,
        store.clone(),
        vault.clone(),
        tasks.clone(),
        clock.clone(),
        settings,
    );
    Harness {
        loader,
        store,
        clock,
        tasks,
        vault,
    }
}

fn context_body() -> serde_json::Value {
    json!({
        "profile": {"first_name": "Jane", "experiences": [{"company": "Acme"}]},
        "custom_answers": {"sponsorship": "No"},
        "resume_text": "Engineer at Acme"
    })
}

async fn mount_context(server: &MockServer, body: serde_json::Value, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(CONTEXT_PATH))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetches_and_persists() {
    let server = MockServer::start().await;
    mount_context(&server, context_body(), 1).await;
    let h = harness(&server).await;

    let context = h.loader.load_context().await;
    assert_eq!(context.profile["first_name"], "Jane");
    assert_eq!(context.custom_answers["sponsorship"], "No");
    assert!(h.loader.is_loaded());

    let stored = h.store.get(CONTEXT_KEY).await.unwrap().unwrap();
    assert_eq!(stored["context"]["resume_text"], "Engineer at Acme");
    assert_eq!(stored["fetched_at"], 1_700_000_000_000i64);

    // Second load is served locally.
    assert_eq!(h.loader.load_context().await, context);
}

#[tokio::test]
async fn test_fresh_durable_copy_skips_network() {
    let server = MockServer::start().await;
    mount_context(&server, context_body(), 0).await;
    let h = harness(&server).await;

    h.store
        .set(
            CONTEXT_KEY,
            json!({
                "context": {"profile": {"first_name": "Cached"}, "custom_answers": {}},
                "fetched_at": h.clock.now_millis() - 9 * MINUTE
            }),
        )
        .await
        .unwrap();

    let context = h.loader.load_context().await;
    assert_eq!(context.profile["first_name"], "Cached");
    assert!(h.loader.is_loaded());
}

#[tokio::test]
async fn test_stale_durable_copy_refetches() {
    let server = MockServer::start().await;
    mount_context(&server, context_body(), 1).await;
    let h = harness(&server).await;

    h.store
        .set(
            CONTEXT_KEY,
            json!({
                "context": {"profile": {"first_name": "Old"}, "custom_answers": {}},
                "fetched_at": h.clock.now_millis() - 10 * MINUTE
            }),
        )
        .await
        .unwrap();

    let context = h.loader.load_context().await;
    assert_eq!(context.profile["first_name"], "Jane");
}

#[tokio::test]
async fn test_loaded_flag_outlives_ttl() {
    let server = MockServer::start().await;
    mount_context(&server, context_body(), 1).await;
    let h = harness(&server).await;

    h.loader.load_context().await;
    h.clock.advance(60 * MINUTE);
    let context = h.loader.load_context().await;
    assert_eq!(context.profile["first_name"], "Jane");
}

#[tokio::test]
async fn test_loaded_flag_ignores_context_without_answers() {
    let server = MockServer::start().await;
    mount_context(
        &server,
        json!({"profile": {"first_name": "Jane"}, "custom_answers": {}}),
        2,
    )
    .await;
    let h = harness(&server).await;

    h.loader.load_context().await;
    assert!(h.loader.is_loaded());
    h.clock.advance(60 * MINUTE);

    let context = h.loader.load_context().await;
    assert_eq!(context.profile["first_name"], "Jane");
}

#[tokio::test]
async fn test_server_error_yields_empty_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CONTEXT_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let h = harness(&server).await;

    let context = h.loader.load_context().await;
    assert!(context.is_empty());
    assert!(context.resume_text.is_empty());
    assert!(!h.loader.is_loaded());
    assert!(h.store.get(CONTEXT_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn test_malformed_body_yields_empty_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CONTEXT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;
    let h = harness(&server).await;

    assert!(h.loader.load_context().await.is_empty());
}

#[tokio::test]
async fn test_resume_prefetched_in_background() {
    let server = MockServer::start().await;
    let mut body = context_body();
    body["resume_url"] = json!("/api/chrome-extension/autofill/resume/jane.pdf");
    body["resume_name"] = json!("Jane Doe.pdf");
    mount_context(&server, body, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/chrome-extension/autofill/resume/jane.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    let h = harness(&server).await;

    let context = h.loader.load_context().await;
    assert_eq!(context.resume_name.as_deref(), Some("Jane Doe.pdf"));

    h.tasks.drain().await;
    let resume = h.vault.load_resume().await.unwrap().unwrap();
    assert_eq!(resume.name, "Jane Doe.pdf");
    assert_eq!(resume.buffer, "JVBERi0xLjQ=");
}

#[tokio::test]
async fn test_resume_prefetch_failure_is_contained() {
    let server = MockServer::start().await;
    let mut body = context_body();
    body["resume_url"] = json!("/api/chrome-extension/autofill/resume/missing.pdf");
    mount_context(&server, body, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/chrome-extension/autofill/resume/missing.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let h = harness(&server).await;

    let context = h.loader.load_context().await;
    assert_eq!(context.profile["first_name"], "Jane");

    h.tasks.drain().await;
    assert_eq!(h.tasks.metrics().failed, 1);
    assert!(h.vault.load_resume().await.unwrap().is_none());
}

#[tokio::test]
async fn test_no_prefetch_without_resume_reference() {
    let server = MockServer::start().await;
    mount_context(&server, context_body(), 1).await;
    let h = harness(&server).await;

    h.loader.load_context().await;
    assert_eq!(h.tasks.metrics().spawned, 0);
}

#[tokio::test]
async fn test_invalidate_forces_refetch() {
    let server = MockServer::start().await;
    mount_context(&server, context_body(), 2).await;
    let h = harness(&server).await;

    h.loader.load_context().await;
    h.loader.invalidate().await.unwrap();
    assert!(!h.loader.is_loaded());
    h.loader.load_context().await;
}

#[test]
fn test_resolve_resume_url() {
    let base = "http://localhost:8000/api";
    assert_eq!(
        resolve_resume_url(base, "/api/chrome-extension/autofill/resume/a.pdf")
            .unwrap()
            .as_str(),
        "http://localhost:8000/api/chrome-extension/autofill/resume/a.pdf"
    );
    assert_eq!(
        resolve_resume_url(base, "https://cdn.example.com/r/b.pdf")
            .unwrap()
            .as_str(),
        "https://cdn.example.com/r/b.pdf"
    );
    assert!(resolve_resume_url("not a url", "/a.pdf").is_err());
}

#[test]
fn test_file_name_fallback() {
    let url = Url::parse("https://cdn.example.com/").unwrap();
    assert_eq!(file_name(&url), "resume.pdf");
    let url = Url::parse("https://cdn.example.com/files/cv.pdf").unwrap();
    assert_eq!(file_name(&url), "cv.pdf");
}
