//! Shared test utilities: a local stand-in for the generateContent endpoint

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    routing::post,
};
use image_chat::GeminiConfig;
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// API key the stub expects
pub const TEST_API_KEY: &str = "test-api-key";

/// Base64 of `b"hello"`
pub const HELLO_PNG_B64: &str = "aGVsbG8=";

/// A request received by the stub
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub api_key: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    body: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Running stub endpoint
pub struct Upstream {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl Upstream {
    /// Session configuration pointing at this stub
    pub fn config(&self) -> GeminiConfig {
        GeminiConfig::new(&self.url, TEST_API_KEY)
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn handle(
    State(state): State<StubState>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let api_key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body_json = serde_json::from_str(&body).unwrap_or(Value::Null);

    state.requests.lock().unwrap().push(RecordedRequest {
        api_key,
        body: body_json,
    });

    (
        state.status,
        [(header::CONTENT_TYPE, "application/json")],
        state.body,
    )
}

/// Start a stub that answers every request with `status` and a raw body
pub async fn spawn_upstream_raw(status: StatusCode, body: impl Into<String>) -> Upstream {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        status,
        body: body.into(),
        requests: requests.clone(),
    };

    let app = Router::new()
        .route("/v1beta/generate", post(handle))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Upstream {
        url: format!("http://{addr}/v1beta/generate"),
        requests,
    }
}

/// Start a stub that answers every request with `status` and a JSON body
pub async fn spawn_upstream(status: StatusCode, body: &Value) -> Upstream {
    spawn_upstream_raw(status, body.to_string()).await
}

/// A typical successful response: one text part and one image part
pub fn image_response(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [
                    {"text": text},
                    {"inlineData": {"mimeType": "image/png", "data": HELLO_PNG_B64}}
                ]
            }
        }]
    })
}

/// A response with a thinking image before the final one
pub fn thinking_response() -> Value {
    json!({
        "thought_signature": "sig-123",
        "groundingMetadata": {"webSearchQueries": ["sf weather"]},
        "candidates": [{
            "content": {
                "parts": [
                    {"inlineData": {"mimeType": "image/png", "data": "ZHJhZnQ="}, "thought": true},
                    {"text": "final"},
                    {"inlineData": {"mimeType": "image/png", "data": HELLO_PNG_B64}}
                ]
            }
        }]
    })
}

/// A response without any image part
pub fn text_only_response() -> Value {
    json!({
        "candidates": [{"content": {"parts": [{"text": "I can't draw that"}]}}]
    })
}
