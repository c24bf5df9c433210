use std::sync::{Arc, OnceLock};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::api;
use crate::core::results::GradingRecord;
use crate::core::{config::Settings, state::AppState};
use crate::services::content_origin::ContentOriginReport;
use crate::services::report_parser::CriterionScore;

pub(crate) const MULTIPART_BOUNDARY: &str = "essaymark-test-boundary";

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("ESSAYMARK_ENV", "test");
    std::env::set_var("ESSAYMARK_STRICT_CONFIG", "0");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::set_var("LLM_API_KEY", "test-key");
    std::env::set_var("LLM_BASE_URL", "http://localhost:9/llm");
    std::env::set_var("DETECTION_API_TOKEN", "test-token");
    std::env::set_var("RESULT_TTL_SECONDS", "60");
    std::env::remove_var("BACKEND_CORS_ORIGINS");
    std::env::remove_var("API_PREFIX");
}

pub(crate) async fn setup_test_context() -> TestContext {
    let guard = env_lock().await;
    set_test_env();

    let settings = Settings::load().expect("settings");
    let state = AppState::from_settings(settings).expect("state");
    let app = api::router::router(state.clone());

    TestContext { state, app, _guard: guard }
}

pub(crate) fn sample_record(grading_id: &str, criterion: &str) -> GradingRecord {
    GradingRecord::new(
        grading_id.to_string(),
        vec![CriterionScore {
            criteria: criterion.to_string(),
            scored: "8".to_string(),
            total: "10".to_string(),
        }],
        vec![85.0],
        vec!["B".to_string()],
        None,
    )
}

pub(crate) fn sample_record_with_detection(grading_id: &str) -> GradingRecord {
    GradingRecord::new(
        grading_id.to_string(),
        Vec::new(),
        Vec::new(),
        Vec::new(),
        Some(ContentOriginReport {
            classification: "AI-generated content".to_string(),
            ai_score: 70.0,
            human_score: 30.0,
            total_words: 512,
            model_version: "v9".to_string(),
        }),
    )
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) struct MultipartField<'a> {
    pub(crate) name: &'a str,
    pub(crate) filename: Option<&'a str>,
    pub(crate) content_type: Option<&'a str>,
    pub(crate) data: Vec<u8>,
}

pub(crate) fn multipart_body(fields: &[MultipartField<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for field in fields {
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
        let mut disposition =
            format!("Content-Disposition: form-data; name=\"{}\"", field.name);
        if let Some(filename) = field.filename {
            disposition.push_str(&format!("; filename=\"{filename}\""));
        }
        disposition.push_str("\r\n");
        body.extend_from_slice(disposition.as_bytes());
        if let Some(content_type) = field.content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&field.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

pub(crate) fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request body")
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
