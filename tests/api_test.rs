//! HTTP API Tests - Router Driven In-Process
//!
//! Builds the full router (middleware included) over the in-memory store
//! and drives it with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::Router;
use serde_json::{Value, json};
use tower::ServiceExt;

use intel_unit::adapters::http::{AppState, create_router};
use intel_unit::adapters::metrics::MetricsRegistry;
use intel_unit::adapters::persistence::InMemoryReportStore;
use intel_unit::config::{AppConfig, Environment};

struct TestApp {
    router: Router,
    store: Arc<InMemoryReportStore>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(InMemoryReportStore::new());
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        let state = AppState::new(store.clone(), &config, metrics);
        Self {
            router: create_router(state),
            store,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.raw(method, uri, body).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn raw(&self, method: Method, uri: &str, body: Option<Value>) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }
}

fn convoy_report() -> Value {
    json!({
        "fieldCode": "AX-12",
        "location": "Berlin Sector 4",
        "threatLevel": 5,
        "description": "Unusual convoy movement observed near checkpoint"
    })
}

#[tokio::test]
async fn test_report_lifecycle_scenario() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::POST, "/reports", Some(convoy_report())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Report created successfully");
    let report = &body["data"]["report"];
    assert_eq!(report["threatLevel"], 5);
    assert_eq!(report["confirmed"], false);
    assert!(report.get("confirmedAt").is_none());
    let id = report["id"].as_str().unwrap().to_string();

    let (status, body) = app.send(Method::GET, "/reports/high", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["reports"][0]["id"], id.as_str());

    let (status, body) = app
        .send(Method::PUT, &format!("/reports/{id}/confirm"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["report"]["confirmed"], true);
    assert!(body["data"]["report"]["confirmedAt"].is_string());

    let (status, body) = app.send(Method::DELETE, &format!("/reports/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deletedId"], id.as_str());

    let (status, body) = app.send(Method::GET, &format!("/reports/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Report not found");
}

#[tokio::test]
async fn test_create_validation_lists_all_violations() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Method::POST, "/reports", Some(json!({ "threatLevel": 7 })))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Validation failed"));
    let details = body["details"].as_array().unwrap();
    assert_eq!(details.len(), 4);
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/reports")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"fieldCode\": "))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_id_is_bad_request_for_every_id_route() {
    let app = TestApp::new();
    for (method, uri) in [
        (Method::GET, "/reports/not-an-id"),
        (Method::PUT, "/reports/not-an-id/confirm"),
        (Method::DELETE, "/reports/not-an-id"),
    ] {
        let (status, body) = app.send(method, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "Invalid report ID format");
    }
}

#[tokio::test]
async fn test_list_filters_and_rejects_bad_query() {
    let app = TestApp::new();
    for level in [1, 4, 5] {
        let mut report = convoy_report();
        report["threatLevel"] = json!(level);
        app.send(Method::POST, "/reports", Some(report)).await;
    }

    let (status, body) = app.send(Method::GET, "/reports?threatLevel=4", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);

    let (status, body) = app.send(Method::GET, "/reports?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 2);

    let (status, _) = app.send(Method::GET, "/reports?limit=500", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.send(Method::GET, "/reports/agent/AX-12", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["agent"], "AX-12");
    assert_eq!(body["data"]["count"], 3);
}

#[tokio::test]
async fn test_patch_updates_fields() {
    let app = TestApp::new();
    let (_, body) = app.send(Method::POST, "/reports", Some(convoy_report())).await;
    let id = body["data"]["report"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/reports/{id}"),
            Some(json!({ "threatLevel": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["report"]["threatLevel"], 2);
    assert!(body["data"]["report"]["updatedAt"].is_string());

    let (status, _) = app
        .send(Method::PATCH, &format!("/reports/{id}"), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_snapshot_shape() {
    let app = TestApp::new();
    app.send(Method::POST, "/reports", Some(convoy_report())).await;

    let (status, body) = app.send(Method::GET, "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["overview"]["totalReports"], 1);
    assert_eq!(data["overview"]["highThreatReports"], 1);
    assert_eq!(data["overview"]["confirmationRate"], "0.0%");
    assert_eq!(data["threatLevelDistribution"][0]["threatLevel"], 5);
    assert_eq!(data["topAgents"][0]["fieldCode"], "AX-12");
    assert_eq!(data["topAgents"][0]["highThreatCount"], 1);
}

#[tokio::test]
async fn test_health_reports_store_connectivity() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["message"], "Intelligence Unit API is healthy");
    assert_eq!(body["service"], "Intelligence Unit API");
    assert_eq!(body["database"]["status"], "connected");

    app.store.set_available(false);
    let (status, body) = app.send(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert!(body["message"].as_str().unwrap().contains("degraded"));
    assert_eq!(body["database"]["status"], "disconnected");
    assert!(body["database"]["error"].is_string());
}

#[tokio::test]
async fn test_store_error_detail_only_in_development() {
    let app = TestApp::new();
    app.store.set_available(false);
    let (status, body) = app.send(Method::GET, "/reports", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert!(body["detail"].is_string());

    let mut config = AppConfig::default();
    config.server.environment = Environment::Production;
    let app = TestApp::with_config(config);
    app.store.set_available(false);
    let (status, body) = app.send(Method::GET, "/reports", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("detail").is_none());
}

#[tokio::test]
async fn test_write_tier_rate_limit() {
    let mut config = AppConfig::default();
    config.rate_limits.write_max = 2;
    let app = TestApp::with_config(config);

    for _ in 0..2 {
        let (status, _) = app.send(Method::POST, "/reports", Some(convoy_report())).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let response = app.raw(Method::POST, "/reports", Some(convoy_report())).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    // Reads have their own budget.
    let (status, _) = app.send(Method::GET, "/reports", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_and_headers() {
    let app = TestApp::new();
    let response = app.raw(Method::GET, "/nowhere", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let headers = response.headers();
    assert!(headers.contains_key("x-request-id"));
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");

    let (_, body) = app.send(Method::GET, "/nowhere", None).await;
    assert_eq!(body, json!({ "success": false, "error": "Route not found" }));
}

#[tokio::test]
async fn test_root_and_metrics() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "operational");
    assert_eq!(body["message"], "Intelligence Unit API is operational");

    app.send(Method::POST, "/reports", Some(convoy_report())).await;
    let response = app.raw(Method::GET, "/metrics", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("intel_reports_created_total 1"));
    assert!(text.contains("intel_http_requests_total"));
}

async fn preflight(app: &TestApp, origin: &str) -> axum::response::Response {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/reports")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

#[tokio::test]
async fn test_cors_configured_origin_with_credentials() {
    let app = TestApp::new();
    let response = preflight(&app, "http://localhost:3000").await;
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:3000");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

    let response = preflight(&app, "https://elsewhere.example").await;
    assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_cors_wildcard_origin_builds_router() {
    let mut config = AppConfig::default();
    config.server.allowed_origins = vec!["*".to_string(), "not a\norigin".to_string()];
    let app = TestApp::with_config(config);

    let response = preflight(&app, "https://anywhere.example").await;
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(!headers.contains_key(header::ACCESS_CONTROL_ALLOW_CREDENTIALS));
}

#[tokio::test]
async fn test_invalid_origin_is_skipped() {
    let mut config = AppConfig::default();
    config.server.allowed_origins = vec![
        "bad\u{7f}origin".to_string(),
        "https://ops.example".to_string(),
    ];
    let app = TestApp::with_config(config);

    let response = preflight(&app, "https://ops.example").await;
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://ops.example"
    );
}
