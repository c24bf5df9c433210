use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::core::config::Settings;

const SCAN_ID_MAX_LEN: usize = 36;

/// Verdict from the external AI-content-detection API for one text.
#[derive(Debug, Clone)]
pub(crate) struct ContentOriginReport {
    pub(crate) classification: String,
    pub(crate) ai_score: f64,
    pub(crate) human_score: f64,
    pub(crate) total_words: u64,
    pub(crate) model_version: String,
}

#[derive(Debug, Clone)]
pub(crate) struct ContentOriginService {
    client: Client,
    api_token: String,
    base_url: String,
    language: String,
    sandbox: bool,
    student_id: String,
}

impl ContentOriginService {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.detection().timeout_seconds);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .timeout(timeout)
            .build()
            .context("Failed to build content-detection HTTP client")?;

        Ok(Self {
            client,
            api_token: settings.detection().api_token.clone(),
            base_url: settings.detection().base_url.trim_end_matches('/').to_string(),
            language: settings.detection().language.clone(),
            sandbox: settings.detection().sandbox,
            student_id: settings.detection().student_id.clone(),
        })
    }

    /// Submits one text for origin detection. Every transport or decode
    /// failure comes back as an error value for the caller to inspect; this
    /// method never panics on malformed upstream data.
    pub(crate) async fn check(&self, text: &str) -> Result<ContentOriginReport> {
        let scan_id = create_scan_id(&self.student_id);
        let url = format!("{}/v2/writer-detector/{}/check", self.base_url, scan_id);
        let payload = json!({
            "text": text,
            "language": self.language,
            "sandbox": self.sandbox
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await
            .context("Failed to call content-detection API")?;

        let status = response.status();
        let raw_body =
            response.text().await.context("Failed to read content-detection response")?;
        let parsed: Value = serde_json::from_str(&raw_body).map_err(|err| {
            anyhow::anyhow!(
                "Content-detection API returned non-JSON body (status {status}): {err}: {raw_body}"
            )
        })?;

        if !status.is_success() {
            anyhow::bail!(
                "Content-detection check failed (status {status}): {}",
                extract_error_message(&parsed)
            );
        }

        let summary = parsed.get("summary").cloned().unwrap_or_else(|| json!({}));
        let ai_score = summary.get("ai").and_then(Value::as_f64).unwrap_or(0.0);
        let human_score = summary.get("human").and_then(Value::as_f64).unwrap_or(0.0);
        let total_words = parsed
            .get("scannedDocument")
            .and_then(|document| document.get("totalWords"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let model_version = parsed
            .get("modelVersion")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string();

        tracing::info!(scan_id = %scan_id, ai_score, human_score, "Content-origin check completed");

        Ok(ContentOriginReport {
            classification: classify(ai_score, human_score).to_string(),
            ai_score,
            human_score,
            total_words,
            model_version,
        })
    }
}

/// Scan identifier in the shape `{student_id}-submission{8 hex chars}`,
/// truncated to the detection API's 36-character ceiling.
pub(crate) fn create_scan_id(student_id: &str) -> String {
    let uuid_part = Uuid::new_v4().simple().to_string();
    let mut scan_id = format!("{student_id}-submission{}", &uuid_part[..8]);
    scan_id.truncate(SCAN_ID_MAX_LEN);
    scan_id
}

/// Comparative verdict; an exact score tie is deliberately undetermined.
pub(crate) fn classify(ai_score: f64, human_score: f64) -> &'static str {
    if ai_score > human_score {
        "AI-generated content"
    } else if human_score > ai_score {
        "Human-generated content"
    } else {
        "Undetermined"
    }
}

fn extract_error_message(payload: &Value) -> String {
    payload
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| payload.get("error").and_then(Value::as_str))
        .unwrap_or("unknown_error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_ai_score_classifies_as_ai_generated() {
        assert_eq!(classify(70.0, 30.0), "AI-generated content");
    }

    #[test]
    fn higher_human_score_classifies_as_human_generated() {
        assert_eq!(classify(30.0, 70.0), "Human-generated content");
    }

    #[test]
    fn equal_scores_are_undetermined() {
        assert_eq!(classify(50.0, 50.0), "Undetermined");
    }

    #[test]
    fn scan_id_has_the_expected_shape() {
        let scan_id = create_scan_id("studentid123");
        let suffix = scan_id.strip_prefix("studentid123-submission").expect("prefix");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn scan_id_never_exceeds_the_api_ceiling() {
        let scan_id = create_scan_id(&"x".repeat(64));
        assert!(scan_id.len() <= 36);
    }

    #[test]
    fn scan_ids_differ_between_calls() {
        assert_ne!(create_scan_id("studentid123"), create_scan_id("studentid123"));
    }
}
