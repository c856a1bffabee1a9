//! Router-level tests with a stub engine standing in for the model session.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use charla::api::{self, AppState};
use charla::error::InferenceError;
use charla::inference::CompletionEngine;

struct RecordedCall {
    prompt: String,
    max_tokens: usize,
    stop: Vec<String>,
}

struct StubEngine {
    reply: Result<&'static str, ()>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

#[async_trait]
impl CompletionEngine for StubEngine {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: usize,
        stop: &[&str],
    ) -> Result<String, InferenceError> {
        self.calls.lock().unwrap().push(RecordedCall {
            prompt: prompt.to_string(),
            max_tokens,
            stop: stop.iter().map(|s| s.to_string()).collect(),
        });
        match self.reply {
            Ok(text) => Ok(text.to_string()),
            Err(()) => Err(InferenceError::Tokenizer("stub failure".into())),
        }
    }
}

fn app_with(reply: Result<&'static str, ()>) -> (Router, Arc<Mutex<Vec<RecordedCall>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let engine = StubEngine {
        reply,
        calls: Arc::clone(&calls),
    };
    let state = AppState {
        engine: Arc::new(engine),
    };
    (api::router().with_state(state), calls)
}

async fn post_chat(app: Router, body: Value) -> (StatusCode, Option<Value>) {
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).ok())
}

#[tokio::test]
async fn replies_with_trimmed_model_output() {
    let (app, calls) = app_with(Ok("  4  "));
    let (status, body) = post_chat(app, json!({ "message": "What is 2+2?" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap(), json!({ "reply": "4" }));

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].prompt, "[INST] What is 2+2? [/INST]");
    assert_eq!(calls[0].max_tokens, 256);
    assert_eq!(calls[0].stop, vec!["[/INST]".to_string()]);
}

#[tokio::test]
async fn hello_prompt_is_wrapped_exactly() {
    let (app, calls) = app_with(Ok("Hi there."));
    let (status, body) = post_chat(app, json!({ "message": "Hello" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap(), json!({ "reply": "Hi there." }));
    assert_eq!(calls.lock().unwrap()[0].prompt, "[INST] Hello [/INST]");
}

#[tokio::test]
async fn surrounding_whitespace_is_trimmed_before_wrapping() {
    let (app, calls) = app_with(Ok("ok"));
    post_chat(app, json!({ "message": "  Hello  " })).await;

    assert_eq!(calls.lock().unwrap()[0].prompt, "[INST] Hello [/INST]");
}

#[tokio::test]
async fn blank_input_short_circuits_without_model_call() {
    let blanks = [json!({ "message": "" }), json!({ "message": "   " }), json!({})];
    for input in blanks {
        let (app, calls) = app_with(Ok("should never be used"));
        let (status, body) = post_chat(app, input).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap(), json!({ "reply": "" }));
        assert!(calls.lock().unwrap().is_empty());
    }
}

#[tokio::test]
async fn engine_failure_surfaces_as_opaque_500() {
    let (app, _calls) = app_with(Err(()));
    let (status, body) = post_chat(app, json!({ "message": "boom" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    // Opaque plain-text body, no structured error payload.
    assert!(body.is_none());
}

#[tokio::test]
async fn index_serves_chat_page() {
    let (app, _calls) = app_with(Ok(""));
    let res = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(page.contains("<title>charla</title>"));
    assert!(page.contains("chat-form"));
}
