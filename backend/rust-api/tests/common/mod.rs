#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use practice_engine_api::{config::Config, create_router, services::AppState};
use std::sync::Arc;
use tower::ServiceExt;

pub const SEED: u64 = 20240917;

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.selection.seed = Some(SEED);
    config
}

pub async fn create_test_app() -> Router {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let app_state =
        Arc::new(AppState::new(test_config()).expect("Failed to initialize test app state"));

    create_router(app_state)
}

/// App with the three-question catalog used across the practice tests:
/// q1 and q2 tag K1, q3 tags K2.
pub async fn create_seeded_app() -> Router {
    let app = create_test_app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/catalog/questions",
        Some(json!({
            "questions": [
                question_json("q1", &["K1"], 2),
                question_json("q2", &["K1"], 2),
                question_json("q3", &["K2"], 4),
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "seeding failed: {}", body);
    app
}

pub fn question_json(id: &str, knowledge_points: &[&str], difficulty: u8) -> Value {
    json!({
        "id": id,
        "content": format!("Question {}", id),
        "options": [
            {"key": "A", "text": "first"},
            {"key": "B", "text": "second"},
            {"key": "C", "text": "third"},
            {"key": "D", "text": "fourth"}
        ],
        "correct_answer": "A",
        "explanation": "A is correct",
        "difficulty": difficulty,
        "subject": "software-design",
        "knowledge_points": knowledge_points,
    })
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => builder
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub async fn answer(
    app: &Router,
    user_id: &str,
    question_id: &str,
    chosen: &str,
    session_id: Option<&str>,
) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        &format!("/api/v1/users/{}/answers", user_id),
        Some(json!({
            "question_id": question_id,
            "chosen": chosen,
            "latency_ms": 1500,
            "session_id": session_id,
        })),
    )
    .await
}
