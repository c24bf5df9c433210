use std::time::Duration;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::Settings;

/// One decoded upload destined for the vision model.
#[derive(Debug, Clone)]
pub(crate) struct ImagePart {
    pub(crate) mime_type: String,
    pub(crate) bytes: Vec<u8>,
}

/// Client for the OpenAI-compatible completion and embedding endpoints.
/// All calls carry connect and request timeouts; submits are retried with
/// exponential backoff before the failure is surfaced to the request.
#[derive(Debug, Clone)]
pub(crate) struct LlmService {
    client: Client,
    api_key: String,
    base_url: String,
    text_model: String,
    vision_model: String,
    embedding_model: String,
    max_tokens: u32,
    temperature: f64,
    max_submit_retries: u32,
}

impl LlmService {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.ai().request_timeout);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .context("Failed to build LLM HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.ai().llm_api_key.clone(),
            base_url: settings.ai().llm_base_url.trim_end_matches('/').to_string(),
            text_model: settings.ai().text_model.clone(),
            vision_model: settings.ai().vision_model.clone(),
            embedding_model: settings.ai().embedding_model.clone(),
            max_tokens: settings.ai().max_tokens,
            temperature: settings.ai().temperature,
            max_submit_retries: settings.ai().max_submit_retries,
        })
    }

    pub(crate) async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let payload = json!({
            "model": self.text_model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "max_completion_tokens": self.max_tokens,
            "temperature": self.temperature
        });

        self.send_chat(payload).await
    }

    pub(crate) async fn complete_vision(
        &self,
        prompt: &str,
        images: &[ImagePart],
    ) -> Result<String> {
        let mut content = vec![json!({"type": "text", "text": prompt})];
        for image in images {
            let encoded = STANDARD.encode(&image.bytes);
            content.push(json!({
                "type": "image_url",
                "image_url": {"url": format!("data:{};base64,{encoded}", image.mime_type)}
            }));
        }

        let payload = json!({
            "model": self.vision_model,
            "messages": [{"role": "user", "content": content}],
            "max_completion_tokens": self.max_tokens,
            "temperature": self.temperature
        });

        self.send_chat(payload).await
    }

    pub(crate) async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let payload = json!({"model": self.embedding_model, "input": inputs});

        let body = self.post_json(&url, &payload).await?;
        let data =
            body.get("data").and_then(Value::as_array).context("Missing embedding response data")?;

        let mut vectors = Vec::with_capacity(data.len());
        for item in data {
            let embedding = item
                .get("embedding")
                .and_then(Value::as_array)
                .context("Missing embedding vector in response")?;
            vectors.push(
                embedding.iter().map(|value| value.as_f64().unwrap_or(0.0) as f32).collect(),
            );
        }

        if vectors.len() != inputs.len() {
            anyhow::bail!(
                "Embedding API returned {} vectors for {} inputs",
                vectors.len(),
                inputs.len()
            );
        }

        Ok(vectors)
    }

    async fn send_chat(&self, payload: Value) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.post_json(&url, &payload).await?;

        let tokens_used = body
            .get("usage")
            .and_then(|usage| usage.get("total_tokens"))
            .and_then(Value::as_u64);
        tracing::debug!(tokens_used, "LLM completion finished");

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .context("Missing LLM response content")?;

        Ok(content.to_string())
    }

    async fn post_json(&self, url: &str, payload: &Value) -> Result<Value> {
        let mut last_error = None;
        let mut body = Value::Null;

        for attempt in 0..=self.max_submit_retries {
            let response =
                self.client.post(url).bearer_auth(&self.api_key).json(payload).send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    body = resp.json().await.unwrap_or(Value::Null);
                    if status.is_success() {
                        last_error = None;
                        break;
                    }
                    last_error = Some(anyhow::anyhow!("LLM API error (status {status}): {body}"));
                }
                Err(err) => {
                    last_error = Some(anyhow::anyhow!(err).context("Failed to call LLM API"));
                }
            }

            if attempt < self.max_submit_retries {
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
            }
        }

        if let Some(err) = last_error {
            return Err(err);
        }

        Ok(body)
    }
}
