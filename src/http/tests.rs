//! End-to-end tests driving the router in-process.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::{router, AppState, HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET};
use crate::config::TollgateConfig;
use crate::provider::{ContentGenerator, DescriptionRequest, GeneratedContent, ProviderError};
use crate::ratelimit::{ClientIdentity, Clock, ManualClock, RateLimitPolicy, WindowStore};

const GENERATE: &str = "/api/v1/generate/description";
const TRANSLATE: &str = "/api/v1/translate";

struct Harness {
    app: Router,
    clock: Arc<ManualClock>,
    store: Arc<WindowStore>,
}

fn harness(api_key: Option<&str>, debug: bool, max_requests: u64, window_secs: u64) -> Harness {
    let mut config = TollgateConfig::default();
    config.auth.api_key = api_key.map(str::to_string);
    config.auth.debug = debug;
    config.rate_limiting.max_requests = max_requests;
    config.rate_limiting.window_secs = window_secs;
    harness_with(config, |state| state)
}

fn harness_with(config: TollgateConfig, customize: impl FnOnce(AppState) -> AppState) -> Harness {
    let clock = Arc::new(ManualClock::new(Duration::from_secs(1_700_000_000)));
    let store = Arc::new(WindowStore::new(RateLimitPolicy::new(
        config.rate_limiting.max_requests,
        config.rate_limiting.window(),
    )));
    let state = customize(AppState::new(&config, store.clone(), clock.clone()));

    Harness {
        app: router(state, &config.server.cors_origins),
        clock,
        store,
    }
}

fn peer(ip: &str) -> SocketAddr {
    format!("{}:40000", ip).parse().unwrap()
}

fn get(path: &str, from: &str) -> Request<Body> {
    let mut request = Request::builder().uri(path).body(Body::empty()).unwrap();
    request.extensions_mut().insert(ConnectInfo(peer(from)));
    request
}

fn post(path: &str, from: &str, api_key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = api_key {
        builder = builder.header("X-API-Key", key);
    }
    let mut request = builder.body(Body::from(body.to_string())).unwrap();
    request.extensions_mut().insert(ConnectInfo(peer(from)));
    request
}

fn description_body() -> Value {
    json!({"product_name": "iPhone 15", "category": "Electronics", "language": "en"})
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_authenticated_call_succeeds_with_budget_headers() {
    let h = harness(Some("secret"), false, 2, 60);

    let response = send(&h.app, post(GENERATE, "10.0.0.1", Some("secret"), description_body())).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[HEADER_LIMIT], "2");
    assert_eq!(response.headers()[HEADER_REMAINING], "1");
    assert_eq!(response.headers()[HEADER_RESET], "1700000060");

    let body = json_body(response).await;
    assert_eq!(
        body,
        json!({
            "success": true,
            "data": {
                "description": "This is a generated description for iPhone 15",
                "language": "en",
                "model": "glm-4-flash",
            }
        })
    );
}

#[tokio::test]
async fn test_two_per_minute_scenario() {
    let h = harness(Some("secret"), false, 2, 60);
    let start = h.clock.now();
    let call = || post(GENERATE, "10.0.0.1", Some("secret"), description_body());

    let first = send(&h.app, call()).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()[HEADER_REMAINING], "1");

    h.clock.set(start + Duration::from_secs(10));
    let second = send(&h.app, call()).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers()[HEADER_REMAINING], "0");

    h.clock.set(start + Duration::from_secs(20));
    let third = send(&h.app, call()).await;
    assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(third.headers()[header::RETRY_AFTER], "60");
    assert_eq!(third.headers()[HEADER_LIMIT], "2");
    assert_eq!(third.headers()[HEADER_REMAINING], "0");
    let body = json_body(third).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], 429);

    h.clock.set(start + Duration::from_secs(61));
    let fourth = send(&h.app, call()).await;
    assert_eq!(fourth.status(), StatusCode::OK);
    // Only the t=10 request is still inside the window.
    assert_eq!(fourth.headers()[HEADER_REMAINING], "0");
    assert_eq!(h.store.in_window(&ClientIdentity::new("10.0.0.1"), h.clock.now()), 2);
}

#[tokio::test]
async fn test_credential_failures() {
    let h = harness(Some("secret"), false, 100, 60);

    let wrong = send(&h.app, post(GENERATE, "10.0.0.1", Some("wrong"), description_body())).await;
    assert_eq!(wrong.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        json_body(wrong).await,
        json!({"success": false, "error": {"code": 403, "message": "Invalid API key"}})
    );

    let missing = send(&h.app, post(GENERATE, "10.0.0.1", None, description_body())).await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(missing.headers()[header::WWW_AUTHENTICATE], "ApiKey");
    assert_eq!(json_body(missing).await["error"]["code"], 401);
}

#[tokio::test]
async fn test_auth_failures_still_carry_budget_headers() {
    let h = harness(Some("secret"), false, 5, 60);

    let response = send(&h.app, post(TRANSLATE, "10.0.0.1", Some("wrong"), json!({}))).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(response.headers()[HEADER_REMAINING], "4");
}

#[tokio::test]
async fn test_unconfigured_key_is_server_error() {
    let h = harness(None, false, 1, 60);

    let response = send(&h.app, post(GENERATE, "10.0.0.9", Some("anything"), description_body())).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({"success": false, "error": {"code": 500, "message": "API key not configured"}})
    );

    // The rate gate still runs first.
    let response = send(&h.app, post(GENERATE, "10.0.0.9", Some("anything"), description_body())).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // Independent of rate state: a fresh client sees the same error.
    let response = send(&h.app, post(TRANSLATE, "10.0.0.10", None, json!({"text": "hi", "to_language": "id"}))).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_debug_mode_without_key_admits() {
    let h = harness(None, true, 10, 60);

    let response = send(&h.app, post(GENERATE, "10.0.0.1", None, json!({"product_name": "Kettle"}))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["language"], "zh");
    assert_eq!(body["data"]["model"], "ERNIE-Bot-4");
}

#[tokio::test]
async fn test_exempt_paths_bypass_both_gates() {
    let h = harness(Some("secret"), false, 1, 60);

    // Exhaust the budget.
    send(&h.app, post(GENERATE, "10.0.0.1", Some("secret"), description_body())).await;
    let blocked = send(&h.app, post(GENERATE, "10.0.0.1", Some("secret"), description_body())).await;
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);

    for path in ["/health", "/", "/docs", "/redoc", "/openapi.json"] {
        let response = send(&h.app, get(path, "10.0.0.1")).await;
        assert_eq!(response.status(), StatusCode::OK, "path {}", path);
        assert!(response.headers().get(HEADER_LIMIT).is_none(), "path {}", path);
    }

    assert_eq!(h.store.in_window(&ClientIdentity::new("10.0.0.1"), h.clock.now()), 1);
}

#[tokio::test]
async fn test_health_and_root_payloads() {
    let h = harness(None, false, 1, 60);

    let health = json_body(send(&h.app, get("/health", "10.0.0.1")).await).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["service"], "TradeCraft AI Service");
    assert_eq!(health["version"], "1.0.0");

    let root = json_body(send(&h.app, get("/", "10.0.0.1")).await).await;
    assert_eq!(root["message"], "Welcome to TradeCraft AI Service");
    assert_eq!(root["docs"], "/docs");
}

#[tokio::test]
async fn test_rejected_requests_never_reach_handler() {
    struct CountingGenerator(std::sync::atomic::AtomicUsize);

    #[async_trait]
    impl ContentGenerator for CountingGenerator {
        async fn generate(&self, input: &DescriptionRequest) -> Result<GeneratedContent, ProviderError> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(GeneratedContent {
                description: input.product_name.clone(),
                language: input.language.clone(),
                model: "counting".to_string(),
            })
        }
    }

    let generator = Arc::new(CountingGenerator(Default::default()));
    let mut config = TollgateConfig::default();
    config.auth.api_key = Some("secret".to_string());
    config.rate_limiting.max_requests = 3;
    let h = harness_with(config, |state| state.with_generator(generator.clone()));

    let mut statuses = Vec::new();
    for _ in 0..5 {
        statuses.push(send(&h.app, post(GENERATE, "10.0.0.1", Some("secret"), description_body())).await.status());
    }

    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 3);
    assert_eq!(generator.0.load(std::sync::atomic::Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_concurrent_requests_admit_exactly_limit() {
    let h = harness(Some("secret"), false, 10, 60);

    let requests = (0..40).map(|_| {
        let app = h.app.clone();
        tokio::spawn(async move {
            app.oneshot(post(GENERATE, "10.0.0.1", Some("secret"), description_body()))
                .await
                .unwrap()
                .status()
        })
    });
    let statuses: Vec<StatusCode> = futures::future::join_all(requests)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 10);
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::TOO_MANY_REQUESTS).count(),
        30
    );
}

#[tokio::test]
async fn test_clients_have_separate_budgets() {
    let h = harness(Some("secret"), false, 1, 60);

    let a = send(&h.app, post(GENERATE, "10.0.0.1", Some("secret"), description_body())).await;
    let b = send(&h.app, post(GENERATE, "10.0.0.2", Some("secret"), description_body())).await;
    let a_again = send(&h.app, post(GENERATE, "10.0.0.1", Some("secret"), description_body())).await;

    assert_eq!(a.status(), StatusCode::OK);
    assert_eq!(b.status(), StatusCode::OK);
    assert_eq!(a_again.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_missing_peer_address_shares_unknown_budget() {
    let h = harness(Some("secret"), false, 1, 60);
    let bare = || {
        Request::builder()
            .method(Method::POST)
            .uri(GENERATE)
            .header("X-API-Key", "secret")
            .body(Body::from(description_body().to_string()))
            .unwrap()
    };

    assert_eq!(send(&h.app, bare()).await.status(), StatusCode::OK);
    assert_eq!(send(&h.app, bare()).await.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_validation_errors() {
    let h = harness(Some("secret"), false, 100, 60);

    let response = send(&h.app, post(GENERATE, "10.0.0.1", Some("secret"), json!({"language": "en"}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["message"], "product_name is required");

    let response = send(&h.app, post(TRANSLATE, "10.0.0.1", Some("secret"), json!({"text": "hello"}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"]["message"],
        "text and to_language are required"
    );

    let mut malformed = post(TRANSLATE, "10.0.0.1", Some("secret"), json!(null));
    *malformed.body_mut() = Body::from("{not json");
    let response = send(&h.app, malformed).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["success"], false);
}

#[tokio::test]
async fn test_auth_checked_before_validation() {
    let h = harness(Some("secret"), false, 100, 60);

    let response = send(&h.app, post(GENERATE, "10.0.0.1", None, json!({}))).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_translate_defaults_source_language() {
    let h = harness(Some("secret"), false, 100, 60);

    let response = send(
        &h.app,
        post(TRANSLATE, "10.0.0.1", Some("secret"), json!({"text": "Hello world", "to_language": "id"})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({
            "success": true,
            "data": {
                "translated_text": "[Translated from auto to id] Hello world",
                "from_language": "auto",
                "to_language": "id",
            }
        })
    );
}

#[tokio::test]
async fn test_provider_failure_passes_through_envelope() {
    struct FailingGenerator;

    #[async_trait]
    impl ContentGenerator for FailingGenerator {
        async fn generate(&self, _input: &DescriptionRequest) -> Result<GeneratedContent, ProviderError> {
            Err(ProviderError::Unavailable("model offline".to_string()))
        }
    }

    for debug in [false, true] {
        let mut config = TollgateConfig::default();
        config.auth.api_key = Some("secret".to_string());
        config.auth.debug = debug;
        let h = harness_with(config, |state| state.with_generator(Arc::new(FailingGenerator)));

        let response = send(&h.app, post(GENERATE, "10.0.0.1", Some("secret"), description_body())).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(HEADER_LIMIT).is_some());
        let body = json_body(response).await;
        assert_eq!(body["error"]["message"], "Internal server error");
        assert_eq!(body["error"].get("detail").is_some(), debug);
    }
}

#[tokio::test]
async fn test_unknown_path_is_rate_limited_404() {
    let h = harness(None, false, 1, 60);

    let response = send(&h.app, get("/nope", "10.0.0.1")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[HEADER_REMAINING], "0");
    assert_eq!(
        json_body(response).await,
        json!({"success": false, "error": {"code": 404, "message": "Not Found"}})
    );

    let response = send(&h.app, get("/nope", "10.0.0.1")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_cors_preflight_not_charged() {
    let h = harness(Some("secret"), false, 1, 60);

    let mut preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri(GENERATE)
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    preflight.extensions_mut().insert(ConnectInfo(peer("10.0.0.1")));

    let response = send(&h.app, preflight).await;
    assert!(response.status().is_success());
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );

    let call = send(&h.app, post(GENERATE, "10.0.0.1", Some("secret"), description_body())).await;
    assert_eq!(call.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_wildcard_cors_origin_echoes_caller() {
    let mut config = TollgateConfig::default();
    config.auth.api_key = Some("secret".to_string());
    config.server.cors_origins = vec!["*".to_string()];
    let h = harness_with(config, |state| state);

    let mut request = post(GENERATE, "10.0.0.1", Some("secret"), description_body());
    request
        .headers_mut()
        .insert(header::ORIGIN, "https://shop.example.com".parse().unwrap());

    let response = send(&h.app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://shop.example.com"
    );
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn test_explicit_empty_language_is_kept() {
    let h = harness(Some("secret"), false, 100, 60);

    let response = send(
        &h.app,
        post(GENERATE, "10.0.0.1", Some("secret"), json!({"product_name": "Kettle", "language": ""})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["language"], "");
    assert_eq!(body["data"]["model"], "glm-4-flash");

    let response = send(
        &h.app,
        post(
            TRANSLATE,
            "10.0.0.1",
            Some("secret"),
            json!({"text": "Hello", "from_language": "", "to_language": "id"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["from_language"], "");
}
