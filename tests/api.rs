use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

use signup_service::app::build_app;
use signup_service::config::{AppConfig, EmailConfig};
use signup_service::errors::StoreError;
use signup_service::services::counter::COUNT_KEY;
use signup_service::services::mailer::{WelcomeMailer, WELCOME_SUBJECT};
use signup_service::services::signup_service::signup_key;
use signup_service::state::app::AppState;
use signup_service::state::kv::{KvStore, MemoryStore};

/// Memory store that counts every call made against it.
#[derive(Clone, Default)]
struct CountingStore {
    inner: MemoryStore,
    gets: Arc<AtomicUsize>,
    puts: Arc<AtomicUsize>,
}

impl CountingStore {
    fn calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst) + self.puts.load(Ordering::SeqCst)
    }

    fn writes(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KvStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, value).await
    }
}

/// Store whose every operation fails.
struct BrokenStore;

#[async_trait]
impl KvStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Poisoned)
    }

    async fn put(&self, _key: &str, _value: String) -> Result<(), StoreError> {
        Err(StoreError::Poisoned)
    }
}

type Captured = Arc<Mutex<Vec<(Option<String>, Value)>>>;

/// Serve a fake email provider that answers every send with `status`.
async fn spawn_provider(status: StatusCode) -> (String, Captured) {
    let captured: Captured = Arc::default();
    let seen = captured.clone();

    let router = Router::new().route(
        "/emails",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let seen = seen.clone();
            async move {
                let auth = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                seen.lock().unwrap().push((auth, body));
                status
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{addr}/emails"), captured)
}

fn test_config() -> AppConfig {
    AppConfig::from_json(r#"{ "port": 0, "log_level": "info", "server_version": "9.9.9" }"#)
        .unwrap()
}

fn app_with(store: Arc<dyn KvStore>, mailer: WelcomeMailer) -> Router {
    build_app(AppState::new(store, mailer), test_config())
}

fn mailer_for(endpoint: &str) -> WelcomeMailer {
    WelcomeMailer::new(&EmailConfig {
        api_key: Some("re_test_key".to_string()),
        from: None,
        endpoint: Some(endpoint.to_string()),
    })
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn subscribe_json(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/subscribe")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

#[tokio::test]
async fn get_signups_reads_zero_with_json_headers() {
    let app = app_with(Arc::new(MemoryStore::new()), WelcomeMailer::disabled());

    let (status, headers, body) = send(&app, get("/signups")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "value": 0 }));
    assert_eq!(headers[header::CONTENT_TYPE], "application/json; charset=utf-8");
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
}

#[tokio::test]
async fn post_signups_increments_every_call() {
    let store = MemoryStore::new();
    let app = app_with(Arc::new(store.clone()), WelcomeMailer::disabled());

    for expected in 1..=3 {
        let (status, _, body) = send(&app, post_empty("/signups")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "value": expected }));
    }

    let (_, _, body) = send(&app, get("/signups")).await;
    assert_eq!(body, json!({ "value": 3 }));
    assert_eq!(store.get(COUNT_KEY).await.unwrap().as_deref(), Some("3"));
}

#[tokio::test]
async fn subscribe_is_idempotent_per_email() {
    let store = MemoryStore::new();
    let app = app_with(Arc::new(store.clone()), WelcomeMailer::disabled());

    let (status, _, first) = send(&app, subscribe_json(json!({ "email": "a@b.com" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, json!({ "ok": true, "value": 1, "status": "new" }));

    let (status, _, second) = send(&app, subscribe_json(json!({ "email": "a@b.com" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second, json!({ "ok": true, "value": 1, "status": "existing" }));

    assert_eq!(
        store.get(&signup_key("a@b.com")).await.unwrap().as_deref(),
        Some("a@b.com")
    );
}

#[tokio::test]
async fn subscribe_normalizes_case_and_whitespace() {
    let store = MemoryStore::new();
    let app = app_with(Arc::new(store.clone()), WelcomeMailer::disabled());

    let (_, _, first) = send(&app, subscribe_json(json!({ "email": "  A@B.com " }))).await;
    let (_, _, second) = send(&app, subscribe_json(json!({ "email": "a@b.com" }))).await;

    assert_eq!(first["status"], "new");
    assert_eq!(second["status"], "existing");
    assert_eq!(store.len().unwrap(), 2); // one signup record + the counter
}

#[tokio::test]
async fn invalid_email_is_rejected_without_store_access() {
    let store = CountingStore::default();
    let app = app_with(Arc::new(store.clone()), WelcomeMailer::disabled());

    let (status, headers, body) =
        send(&app, subscribe_json(json!({ "email": "not-an-email" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "ok": false, "error": "invalid_email" }));
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn unreadable_body_funnels_into_invalid_email() {
    let store = CountingStore::default();
    let app = app_with(Arc::new(store.clone()), WelcomeMailer::disabled());

    let req = Request::builder()
        .method("POST")
        .uri("/subscribe")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ definitely not json"))
        .unwrap();
    let (status, _, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_email");
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn subscribe_accepts_urlencoded_form() {
    let store = CountingStore::default();
    let app = app_with(Arc::new(store.clone()), WelcomeMailer::disabled());

    let req = Request::builder()
        .method("POST")
        .uri("/subscribe")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("email=Form%40Example.com"))
        .unwrap();
    let (status, _, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "value": 1, "status": "new" }));
    // signup record + counter
    assert_eq!(store.writes(), 2);
}

#[tokio::test]
async fn provider_failure_does_not_affect_signup() {
    let (endpoint, captured) = spawn_provider(StatusCode::INTERNAL_SERVER_ERROR).await;
    let app = app_with(Arc::new(MemoryStore::new()), mailer_for(&endpoint));

    let (status, _, body) = send(&app, subscribe_json(json!({ "email": "new@user.io" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "value": 1, "status": "new" }));
    assert_eq!(captured.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn welcome_email_sent_once_for_new_signups_only() {
    let (endpoint, captured) = spawn_provider(StatusCode::OK).await;
    let app = app_with(Arc::new(MemoryStore::new()), mailer_for(&endpoint));

    send(&app, subscribe_json(json!({ "email": "Hello@Example.com" }))).await;
    send(&app, subscribe_json(json!({ "email": "hello@example.com" }))).await;

    let sent = captured.lock().unwrap();
    assert_eq!(sent.len(), 1);

    let (auth, body) = &sent[0];
    assert_eq!(auth.as_deref(), Some("Bearer re_test_key"));
    assert_eq!(body["to"], "hello@example.com");
    assert_eq!(body["from"], "OvaHead <social@ovahead.com>");
    assert_eq!(body["subject"], WELCOME_SUBJECT);
}

#[tokio::test]
async fn unreachable_provider_does_not_affect_signup() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let app = app_with(
        Arc::new(MemoryStore::new()),
        mailer_for(&format!("http://{addr}/emails")),
    );

    let (status, _, body) = send(&app, subscribe_json(json!({ "email": "x@y.zz" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "new");
}

#[tokio::test]
async fn store_failure_becomes_server_error() {
    let app = app_with(Arc::new(BrokenStore), WelcomeMailer::disabled());

    let (status, _, body) = send(&app, get("/signups")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "ok": false, "error": "internal_error" }));

    let (status, _, _) = send(&app, subscribe_json(json!({ "email": "a@b.com" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn system_routes_report_liveness_and_version() {
    let app = app_with(Arc::new(MemoryStore::new()), WelcomeMailer::disabled());

    let res = app.clone().oneshot(get("/system/alive")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");

    let (_, _, body) = send(&app, get("/system/version")).await;
    assert_eq!(body, json!({ "version": "9.9.9" }));
}
