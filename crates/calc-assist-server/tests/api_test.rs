//! End-to-end tests for the HTTP surface, driven through the router with a
//! recording fake completion backend.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use calc_assist_server::config::Settings;
use calc_assist_server::models::chat::{ChatMessage, Role};
use calc_assist_server::services::LlmProvider;
use calc_assist_server::{build_router, AppState};
use parking_lot::Mutex;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Answers `ANSWER {n}` for the n-th call and remembers every message list.
#[derive(Default)]
struct RecordingLlm {
    calls: Mutex<Vec<Vec<ChatMessage>>>,
    fail: bool,
}

#[async_trait::async_trait]
impl LlmProvider for RecordingLlm {
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<Option<String>> {
        if self.fail {
            anyhow::bail!("upstream unavailable");
        }
        let mut calls = self.calls.lock();
        calls.push(messages.to_vec());
        Ok(Some(format!("ANSWER {}", calls.len())))
    }
}

impl RecordingLlm {
    fn last_call(&self) -> Vec<ChatMessage> {
        self.calls.lock().last().cloned().unwrap_or_default()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

struct TestApp {
    router: Router,
    llm: Arc<RecordingLlm>,
    dir: TempDir,
}

fn create_test_app_with(llm: RecordingLlm) -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut settings = Settings::default();
    settings.sessions.store_path = dir.path().join("db.json");
    settings.firmware.directory = dir.path().join("firmware");
    settings.math.base_url = "http://127.0.0.1:9/api/v2".to_string();
    settings.math.timeout_seconds = 2;

    let llm = Arc::new(llm);
    let state = AppState::new(settings, llm.clone());

    TestApp {
        router: build_router(state),
        llm,
        dir,
    }
}

fn create_test_app() -> TestApp {
    create_test_app_with(RecordingLlm::default())
}

async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    content_type: Option<&str>,
    body: Body,
) -> (StatusCode, Bytes) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    let request = builder.body(body).unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
        .await
        .unwrap();
    (status, body)
}

async fn get_text(app: &TestApp, uri: &str) -> (StatusCode, String) {
    let (status, body) = send(app, Method::GET, uri, None, Body::empty()).await;
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn split_session(body: &str) -> (String, String) {
    let (sid, answer) = body.split_once('|').expect("session body has a separator");
    (sid.to_string(), answer.to_string())
}

fn is_session_id(sid: &str) -> bool {
    sid.len() == 8 && sid.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

// ─────────────────────────────────────────────────────────────────────────────
// /ask
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stateless_ask_returns_raw_answer() {
    let app = create_test_app();

    let (status, body) = get_text(&app, "/ask?question=2%2B2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ANSWER 1");

    let call = app.llm.last_call();
    assert_eq!(call.len(), 2);
    assert_eq!(call[0].role, Role::System);
    assert_eq!(call[1].text(), Some("2+2"));
}

#[tokio::test]
async fn test_stateless_requests_create_no_sessions() {
    let app = create_test_app();

    let (_, first) = get_text(&app, "/ask?question=a").await;
    let (_, second) = get_text(&app, "/ask?question=b&math").await;

    assert!(!first.contains('|'));
    assert!(!second.contains('|'));
    assert!(!app.dir.path().join("db.json").exists());

    let (_, health) = get_text(&app, "/health").await;
    let health: serde_json::Value = serde_json::from_str(&health).unwrap();
    assert_eq!(health["active_sessions"], 0);
}

#[tokio::test]
async fn test_math_flag_switches_system_prompt() {
    let app = create_test_app();

    get_text(&app, "/ask?question=x").await;
    let general = app.llm.last_call()[0].text().unwrap().to_string();
    get_text(&app, "/ask?question=x&math").await;
    let math = app.llm.last_call()[0].text().unwrap().to_string();

    assert_ne!(general, math);
    assert!(math.contains("precise math solver"));
}

#[tokio::test]
async fn test_array_question_is_rejected() {
    let app = create_test_app();

    let (status, _) = get_text(&app, "/ask?question=a&question=b").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_text(&app, "/ask?question%5B%5D=a&sid=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.llm.call_count(), 0);
}

#[tokio::test]
async fn test_empty_sid_mints_session() {
    let app = create_test_app();

    let (status, body) = get_text(&app, "/ask?question=2%2B2&sid=").await;

    assert_eq!(status, StatusCode::OK);
    let (sid, answer) = split_session(&body);
    assert!(is_session_id(&sid), "unexpected session id {sid}");
    assert_eq!(answer, "ANSWER 1");
}

#[tokio::test]
async fn test_session_continuity() {
    let app = create_test_app();

    let (_, first) = get_text(&app, "/ask?question=first&sid=").await;
    let (sid, _) = split_session(&first);

    let (_, second) = get_text(&app, &format!("/ask?question=second&sid={sid}")).await;
    let (same_sid, answer) = split_session(&second);
    assert_eq!(same_sid, sid);
    assert_eq!(answer, "ANSWER 2");

    let texts: Vec<_> = app
        .llm
        .last_call()
        .iter()
        .skip(1)
        .map(|m| m.text().unwrap().to_string())
        .collect();
    assert_eq!(texts, vec!["first", "ANSWER 1", "second"]);

    let stored = std::fs::read_to_string(app.dir.path().join("db.json")).unwrap();
    let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
    let messages = stored["conversations"][&sid]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2]["content"], "second");
    assert_eq!(messages[3]["role"], "assistant");
}

#[tokio::test]
async fn test_unknown_sid_gets_fresh_session() {
    let app = create_test_app();

    let (_, body) = get_text(&app, "/ask?question=hi&sid=zzzzzzzz").await;
    let (sid, _) = split_session(&body);

    assert!(is_session_id(&sid));
    assert_ne!(sid, "zzzzzzzz");
}

#[tokio::test]
async fn test_context_window_after_seven_exchanges() {
    let app = create_test_app();

    let (_, body) = get_text(&app, "/ask?question=q1&sid=").await;
    let (sid, _) = split_session(&body);
    for i in 2..=7 {
        get_text(&app, &format!("/ask?question=q{i}&sid={sid}")).await;
    }

    get_text(&app, &format!("/ask?question=q8&sid={sid}")).await;
    let call = app.llm.last_call();

    assert_eq!(call.len(), 12);
    assert_eq!(call[0].role, Role::System);
    assert_eq!(call[1].text(), Some("q3"));
    assert_eq!(call[10].text(), Some("ANSWER 7"));
    assert_eq!(call[11].text(), Some("q8"));
}

#[tokio::test]
async fn test_upstream_failure_is_bare_500() {
    let app = create_test_app_with(RecordingLlm {
        fail: true,
        ..RecordingLlm::default()
    });

    let (status, body) = get_text(&app, "/ask?question=2%2B2&sid=").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.contains("upstream unavailable"));
}

#[tokio::test]
async fn test_corrupt_store_fails_session_but_not_stateless() {
    let app = create_test_app();
    std::fs::write(app.dir.path().join("db.json"), "{ broken").unwrap();

    let (status, _) = get_text(&app, "/ask?question=x&sid=").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, body) = get_text(&app, "/ask?question=x").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ANSWER 1");
}

// ─────────────────────────────────────────────────────────────────────────────
// /history
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_history_round_trip() {
    let app = create_test_app();

    let (_, body) = get_text(&app, "/ask?question=2%2B2&sid=").await;
    let (sid, _) = split_session(&body);

    let (status, page) = get_text(&app, &format!("/history?sid={sid}&p=0")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page, "0/1|Q:2+2 A:ANSWER 1");

    let (_, default_page) = get_text(&app, &format!("/history?sid={sid}&p=abc")).await;
    assert_eq!(default_page, page);
}

#[tokio::test]
async fn test_history_sentinels() {
    let app = create_test_app();

    let (status, body) = get_text(&app, "/history").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "NO SESSION");

    let (status, body) = get_text(&app, "/history?sid=deadbeef").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "0/0|NO HISTORY");

    let (_, ask) = get_text(&app, "/ask?question=q&sid=").await;
    let (sid, _) = split_session(&ask);

    let (status, body) = get_text(&app, &format!("/history?sid={sid}&p=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "1/1|NO MORE");

    let (_, body) = get_text(&app, &format!("/history?sid={sid}&p=-1")).await;
    assert_eq!(body, "-1/1|NO MORE");
}

#[tokio::test]
async fn test_history_truncates_for_display() {
    let app = create_test_app();
    let question = "x".repeat(200);

    let (_, body) = get_text(&app, &format!("/ask?question={question}&sid=")).await;
    let (sid, _) = split_session(&body);

    let (_, page) = get_text(&app, &format!("/history?sid={sid}")).await;
    assert_eq!(page, format!("0/1|Q:{} A:ANSWER 1", "x".repeat(80)));
}

// ─────────────────────────────────────────────────────────────────────────────
// /solve
// ─────────────────────────────────────────────────────────────────────────────

fn tiny_jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 0]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Jpeg).unwrap();
    out.into_inner()
}

#[tokio::test]
async fn test_solve_answers_image_question() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/solve?n=4",
        Some("image/jpg"),
        Body::from(tiny_jpeg()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ANSWER 1");
    assert_eq!(app.llm.last_call()[1].role, Role::User);
    assert!(app.llm.last_call()[1].text().is_none());
}

#[tokio::test]
async fn test_solve_rejects_wrong_content_type_without_calling_model() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/solve",
        Some("image/png"),
        Body::from(tiny_jpeg()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(&body[..], b"bad content-type: image/png");
    assert_eq!(app.llm.call_count(), 0);
}

#[tokio::test]
async fn test_solve_undecodable_image_is_500() {
    let app = create_test_app();

    let (status, _) = send(
        &app,
        Method::POST,
        "/solve",
        Some("image/jpg"),
        Body::from("definitely not a jpeg"),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.llm.call_count(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Math proxy
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_math_requires_expression() {
    let app = create_test_app();

    for path in ["/derive", "/integrate", "/simplify"] {
        let (status, body) = get_text(&app, path).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "missing expr");
    }
}

#[tokio::test]
async fn test_math_upstream_failure_is_in_band() {
    let app = create_test_app();

    let (status, body) = get_text(&app, "/derive?expr=x%5E2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ERROR: FAILED");
}

// ─────────────────────────────────────────────────────────────────────────────
// Firmware
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_firmware_lifecycle() {
    let app = create_test_app();

    let (_, version) = get_text(&app, "/version").await;
    assert_eq!(version, "1.0.0");

    let (status, body) = get_text(&app, "/download").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "No firmware available");

    let (status, body) = send(
        &app,
        Method::POST,
        "/upload",
        Some("application/octet-stream"),
        Body::from(vec![1u8, 2, 3]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(&body[..], b"version required");

    let (status, body) = send(
        &app,
        Method::POST,
        "/upload?version=1.1.0",
        Some("application/octet-stream"),
        Body::from(vec![1u8, 2, 3]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"OK");

    let (_, version) = get_text(&app, "/version").await;
    assert_eq!(version, "1.1.0");

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/download").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=firmware.bin"
    );
    let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&bytes[..], &[1, 2, 3]);
}

#[tokio::test]
async fn test_health() {
    let app = create_test_app();

    let (status, body) = get_text(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "healthy");

    let (status, _) = get_text(&app, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
}
