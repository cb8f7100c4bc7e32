//! Integration tests for tool calling through the chat endpoint.
//!
//! The scripted provider requests tools in phase 1; the tests check what the
//! service fed back to the provider in phase 2 and what the caller received.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::post,
    Router,
};
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tower::ServiceExt;
use wizzybot::{
    chat_handler,
    config::{CompletionConfig, RateSourceConfig, RateSourceKind},
    provider::{MockProvider, Phase, Role, ToolCall},
    tools::FixedRates,
    AppState, Config,
};

const CATALOG: &str = "\
displayTitle,embeddingText,url,imageUrl,productType,discount,price,variants,createDate
Phone Stand,Aluminium stand for any phone,https://shop/stand,https://img/stand.png,3,0,$15.00 USD,Silver,2023-01-03
Smart Phone X,Flagship phone with OLED screen,https://shop/x,https://img/x.png,1,5,$999.00 USD,Black,2023-01-01
Desk Lamp,LED desk lamp,https://shop/lamp,https://img/lamp.png,2,0,$25.00 USD,White,2023-01-02
Smart Phone Y,Budget phone,https://shop/y,https://img/y.png,1,0,$199.00 USD,Blue,2023-01-04
";

fn catalog_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(CATALOG.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn test_config(catalog_path: &Path) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        completion: CompletionConfig {
            api_key: "test-key".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_base: "http://localhost:0".to_string(),
            timeout: Duration::from_secs(5),
        },
        rates: RateSourceConfig {
            kind: RateSourceKind::Fixed,
            app_id: None,
            url: "http://localhost:0".to_string(),
            timeout: Duration::from_secs(5),
        },
        catalog_path: catalog_path.to_path_buf(),
        catalog_cache: false,
        request_timeout_secs: 10,
        shutdown_timeout_secs: 0,
    }
}

/// Helper to create test router with the chat endpoint.
async fn create_test_app(provider: Arc<MockProvider>, catalog_path: &Path) -> Router {
    let state = AppState::with_dependencies(
        test_config(catalog_path),
        provider,
        Arc::new(FixedRates::default()),
    )
    .await
    .expect("Failed to create AppState");

    Router::new()
        .route("/api/chat", post(chat_handler))
        .with_state(Arc::new(state))
}

/// Helper to make JSON POST request.
async fn json_post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));

    (status, body)
}

/// Tool result payloads sent in phase 2, parsed as JSON, in message order.
async fn tool_payloads(provider: &MockProvider) -> Vec<(String, Value)> {
    let requests = provider.requests().await;
    let finalize = requests
        .iter()
        .find(|r| r.phase == Phase::Finalize)
        .expect("phase 2 request was not sent");

    finalize
        .messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(|m| {
            let id = m.tool_call_id.clone().unwrap();
            let payload = serde_json::from_str(m.content.as_deref().unwrap()).unwrap();
            (id, payload)
        })
        .collect()
}

// ============================================================================
// Product Search
// ============================================================================

#[tokio::test]
async fn test_search_returns_top_two_by_score() {
    let file = catalog_file();
    let provider = Arc::new(MockProvider::calling_tools(
        vec![ToolCall::new("call_1", "searchProducts", r#"{"query":"Phone"}"#)],
        "I found Smart Phone X and Smart Phone Y.",
    ));
    let app = create_test_app(Arc::clone(&provider), file.path()).await;

    let (status, response) =
        json_post(app, "/api/chat", json!({ "query": "I am looking for a phone" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["content"], "I found Smart Phone X and Smart Phone Y.");

    let payloads = tool_payloads(&provider).await;
    assert_eq!(payloads.len(), 1);
    let (id, search) = &payloads[0];
    assert_eq!(id, "call_1");

    // Phone Stand, Smart Phone X and Smart Phone Y all score 2; catalog order wins.
    assert_eq!(search["total"], 3);
    let titles: Vec<&str> = search["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["displayTitle"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Phone Stand", "Smart Phone X"]);
}

#[tokio::test]
async fn test_search_without_matches() {
    let file = catalog_file();
    let provider = Arc::new(MockProvider::calling_tools(
        vec![ToolCall::new("call_1", "searchProducts", r#"{"query":"bicycle"}"#)],
        "No bicycles, sorry.",
    ));
    let app = create_test_app(Arc::clone(&provider), file.path()).await;

    let (status, _) = json_post(app, "/api/chat", json!({ "query": "bicycle?" })).await;

    assert_eq!(status, StatusCode::OK);
    let payloads = tool_payloads(&provider).await;
    assert_eq!(payloads[0].1, json!({ "products": [], "total": 0 }));
}

#[tokio::test]
async fn test_unreadable_catalog_degrades_gracefully() {
    let provider = Arc::new(MockProvider::calling_tools(
        vec![ToolCall::new("call_1", "searchProducts", r#"{"query":"phone"}"#)],
        "The catalog is unavailable right now.",
    ));
    let app = create_test_app(Arc::clone(&provider), Path::new("/nonexistent/products.csv")).await;

    let (status, response) = json_post(app, "/api/chat", json!({ "query": "phone" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["content"], "The catalog is unavailable right now.");
    let payloads = tool_payloads(&provider).await;
    assert!(payloads[0].1.as_str().unwrap().starts_with("searchProducts failed"));
}

// ============================================================================
// Currency Conversion
// ============================================================================

#[tokio::test]
async fn test_convert_currencies() {
    let file = catalog_file();
    let provider = Arc::new(MockProvider::calling_tools(
        vec![ToolCall::new(
            "call_1",
            "convertCurrencies",
            r#"{"amount":100,"from":"USD","to":"EUR"}"#,
        )],
        "100 USD is 85 EUR.",
    ));
    let app = create_test_app(Arc::clone(&provider), file.path()).await;

    let (status, response) =
        json_post(app, "/api/chat", json!({ "query": "100 USD in EUR?" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["content"], "100 USD is 85 EUR.");

    let payloads = tool_payloads(&provider).await;
    assert_eq!(
        payloads[0].1,
        json!({ "amount": 100.0, "from": "USD", "to": "EUR", "result": 85.0, "rate": 0.85 })
    );
}

// ============================================================================
// Containment
// ============================================================================

#[tokio::test]
async fn test_unknown_tool_still_completes() {
    let file = catalog_file();
    let provider = Arc::new(MockProvider::calling_tools(
        vec![ToolCall::new("call_1", "doSomething", "{}")],
        "I can't do that, but here is what I know.",
    ));
    let app = create_test_app(Arc::clone(&provider), file.path()).await;

    let (status, response) = json_post(app, "/api/chat", json!({ "query": "do something" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["content"], "I can't do that, but here is what I know.");
    let payloads = tool_payloads(&provider).await;
    assert_eq!(payloads[0].1, json!("Function doSomething not implemented."));
}

#[tokio::test]
async fn test_mixed_calls_keep_order_and_contain_failures() {
    let file = catalog_file();
    let provider = Arc::new(MockProvider::calling_tools(
        vec![
            ToolCall::new("call_1", "searchProducts", r#"{"query": "lamp"}"#),
            ToolCall::new("call_2", "convertCurrencies", r#"{"amount": "lots"}"#),
            ToolCall::new("call_3", "convertCurrencies", r#"{"amount": 10, "from": "gbp", "to": "gbp"}"#),
            ToolCall::new("call_4", "searchProducts", "{not json"),
        ],
        "Mixed results.",
    ));
    let app = create_test_app(Arc::clone(&provider), file.path()).await;

    let (status, response) = json_post(app, "/api/chat", json!({ "query": "lamp and money" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["content"], "Mixed results.");

    let payloads = tool_payloads(&provider).await;
    let ids: Vec<&str> = payloads.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["call_1", "call_2", "call_3", "call_4"]);

    assert_eq!(payloads[0].1["total"], 1);
    assert!(payloads[1]
        .1
        .as_str()
        .unwrap()
        .starts_with("Invalid arguments for convertCurrencies"));
    assert_eq!(payloads[2].1["rate"], 1.0);
    assert_eq!(payloads[2].1["result"], 10.0);
    assert!(payloads[3]
        .1
        .as_str()
        .unwrap()
        .starts_with("Invalid arguments for searchProducts"));
}
