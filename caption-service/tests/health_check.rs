//! End-to-end tests against a spawned caption-service.
//!
//! Both listeners bind random ports; the completion provider is mocked.

use caption_service::config::{
    CaptionConfig, ObservabilitySettings, OpenAiSettings, OpsSettings, DEFAULT_MODEL,
    DEFAULT_OPENAI_BASE_URL,
};
use caption_service::services::providers::mock::MockCaptionProvider;
use caption_service::startup::Application;
use reqwest::Client;
use secrecy::Secret;
use service_core::config::Config as CommonConfig;
use std::sync::Arc;
use std::time::Duration;

struct TestApp {
    port: u16,
    ops_port: u16,
    provider: Arc<MockCaptionProvider>,
}

fn test_config() -> CaptionConfig {
    CaptionConfig {
        common: CommonConfig { port: 0 },
        openai: OpenAiSettings {
            api_key: Secret::new("test-api-key".to_string()),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(5),
        },
        ops: OpsSettings { port: 0 },
        observability: ObservabilitySettings {
            log_level: "error".to_string(),
            otlp_endpoint: None,
        },
    }
}

/// Spawn the application on random ports and return their numbers.
async fn spawn_app(provider: MockCaptionProvider) -> TestApp {
    let provider = Arc::new(provider);
    let app = Application::build_with_provider(test_config(), provider.clone())
        .await
        .expect("Failed to build application");

    let port = app.port();
    let ops_port = app.ops_port();

    // Spawn the server in the background
    tokio::spawn(async move {
        let _ = app.run_until_stopped().await;
    });

    TestApp {
        port,
        ops_port,
        provider,
    }
}

#[tokio::test]
async fn health_check_returns_ok() {
    let app = spawn_app(MockCaptionProvider::replying("unused")).await;
    let client = Client::new();

    let response = client
        .get(format!("http://localhost:{}/health", app.ops_port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "caption-service");
}

#[tokio::test]
async fn readiness_check_returns_ok() {
    let app = spawn_app(MockCaptionProvider::replying("unused")).await;

    let response = Client::new()
        .get(format!("http://localhost:{}/ready", app.ops_port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
}

#[tokio::test]
async fn health_is_not_exposed_on_public_port() {
    let app = spawn_app(MockCaptionProvider::replying("unused")).await;

    let response = Client::new()
        .get(format!("http://localhost:{}/health", app.port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn generate_over_http_returns_phrase() {
    let app = spawn_app(MockCaptionProvider::replying("기분 최고!")).await;

    let response = Client::new()
        .post(format!("http://localhost:{}/api/generate", app.port))
        .json(&serde_json::json!({ "expressions": { "happy": 0.8, "neutral": 0.2 } }))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/json; charset=utf-8"
    );
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["phrase"], "기분 최고!");
    assert_eq!(app.provider.call_count(), 1);
}

#[tokio::test]
async fn metrics_report_routes_and_caption_outcomes() {
    service_core::middleware::metrics::init_metrics().expect("Failed to install recorder");
    let app = spawn_app(MockCaptionProvider::replying("좋아요")).await;
    let client = Client::new();

    let generated = client
        .post(format!("http://localhost:{}/api/generate", app.port))
        .json(&serde_json::json!({ "expressions": { "happy": 0.9 } }))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(generated.status(), reqwest::StatusCode::OK);

    let missing = client
        .get(format!("http://localhost:{}/nowhere", app.port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

    let response = client
        .get(format!("http://localhost:{}/metrics", app.ops_port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body = response.text().await.expect("Failed to read body");
    assert!(body.contains("http_requests_total"), "{}", body);
    assert!(body.contains("http_request_duration_seconds"), "{}", body);
    assert!(body.contains(r#"route="/api/generate""#), "{}", body);
    assert!(body.contains(r#"route="unmatched""#), "{}", body);
    assert!(
        body.contains(r#"caption_requests_total{outcome="success"}"#),
        "{}",
        body
    );
    assert!(body.contains("caption_provider_latency_seconds"), "{}", body);
}
