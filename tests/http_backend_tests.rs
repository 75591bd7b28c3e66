use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use SentiBlaster::annotator::{AnnotationClient, Completion, CompletionBackend, HttpCompletionBackend};
use SentiBlaster::config::ClientConfig;
use SentiBlaster::data_model::{LabelOrError, SentimentLabel};
use SentiBlaster::error::RequestError;

// Serves `app` on an ephemeral local port and returns its base URL.
async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn config_for(api_base: &str) -> ClientConfig {
    let mut config = ClientConfig::new("test-key");
    config.api_base = api_base.to_string();
    config.base_retry_delay = Duration::from_millis(10);
    config.request_timeout = Duration::from_secs(5);
    config
}

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
        ]
    })
}

async fn checked_completion(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v == "Bearer test-key");
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "missing key").into_response();
    }
    let well_formed = body["model"] == "deepseek-chat"
        && body["messages"][0]["role"] == "system"
        && body["messages"][1]["content"]
            .as_str()
            .map_or(false, |c| c.ends_with("今天心情很差"));
    if !well_formed {
        return (StatusCode::BAD_REQUEST, "unexpected body").into_response();
    }
    Json(completion("  消极\n")).into_response()
}

#[tokio::test]
async fn test_successful_completion() {
    let base = spawn_server(Router::new().route("/chat/completions", post(checked_completion))).await;
    let backend = HttpCompletionBackend::new(&config_for(&base)).unwrap();

    let reply = backend.complete("今天心情很差").await.unwrap();
    assert_eq!(reply, Completion::Reply("消极".to_string()));
}

#[tokio::test]
async fn test_empty_choices_keeps_body() {
    let app = Router::new().route(
        "/chat/completions",
        post(|| async { Json(json!({"choices": []})) }),
    );
    let base = spawn_server(app).await;
    let backend = HttpCompletionBackend::new(&config_for(&base)).unwrap();

    assert_eq!(
        backend.complete("x").await.unwrap(),
        Completion::NoChoice(r#"{"choices":[]}"#.to_string())
    );

    let client = AnnotationClient::new(&config_for(&base)).unwrap();
    let label = client.annotate("x").await.unwrap();
    assert_eq!(label.to_string(), r#"未找到情感分析结果: {"choices":[]}"#);
}

#[tokio::test]
async fn test_choice_without_content_is_invalid() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/chat/completions",
            post(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Json(json!({"choices": [{"message": {"role": "assistant", "content": null}}]}))
            }),
        )
        .with_state(hits.clone());
    let base = spawn_server(app).await;

    let backend = HttpCompletionBackend::new(&config_for(&base)).unwrap();
    assert!(matches!(
        backend.complete("x").await,
        Err(RequestError::InvalidResponse(_))
    ));

    // Reported as a failure, not as a blank reply, and not retried.
    let client = AnnotationClient::new(&config_for(&base)).unwrap();
    assert!(client.annotate("x").await.unwrap().is_failed());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_malformed_body_is_not_retried() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/chat/completions",
            post(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                "this is not json"
            }),
        )
        .with_state(hits.clone());
    let base = spawn_server(app).await;

    let backend = HttpCompletionBackend::new(&config_for(&base)).unwrap();
    assert!(matches!(
        backend.complete("x").await,
        Err(RequestError::InvalidResponse(_))
    ));

    let client = AnnotationClient::new(&config_for(&base)).unwrap();
    assert!(client.annotate("x").await.unwrap().is_failed());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/chat/completions",
            post(|State(hits): State<Arc<AtomicUsize>>| async move {
                if hits.fetch_add(1, Ordering::SeqCst) == 0 {
                    (StatusCode::INTERNAL_SERVER_ERROR, "overloaded").into_response()
                } else {
                    Json(completion("非常积极")).into_response()
                }
            }),
        )
        .with_state(hits.clone());
    let base = spawn_server(app).await;

    let backend = HttpCompletionBackend::new(&config_for(&base)).unwrap();
    match backend.complete("x").await {
        Err(RequestError::Transport(msg)) => assert!(msg.contains("500"), "message: {}", msg),
        other => panic!("Expected transport error, got {:?}", other),
    }

    let client = AnnotationClient::new(&config_for(&base)).unwrap();
    assert_eq!(
        client.annotate("x").await.unwrap(),
        LabelOrError::Label(SentimentLabel::VeryPositive)
    );
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_connection_refused_is_transport() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpCompletionBackend::new(&config_for(&format!("http://{}", addr))).unwrap();
    let error = backend.complete("x").await.unwrap_err();
    assert!(matches!(error, RequestError::Transport(_)));
    assert!(error.is_retryable());
}
