//! HTTP client for an Ollama-compatible inference service

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{ChatRequest, GenerateRequest, GenerateResponse, InferenceClient, InferenceError};

/// Pooled HTTP client for `/api/generate` and `/api/chat`.
///
/// Built once at startup and shared; every request carries the client-wide
/// timeout.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::Unavailable(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<Value, InferenceError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| InferenceError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| InferenceError::Malformed(format!("body is not JSON: {}", e)))
    }
}

/// Text of a `/api/generate` reply.
fn generate_text(body: &Value) -> Result<String, InferenceError> {
    body.get("response")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| InferenceError::Malformed("'response' field is missing or not a string".into()))
}

/// Text of a `/api/chat` reply.
fn chat_text(body: &Value) -> Result<String, InferenceError> {
    body.get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            InferenceError::Malformed("'message.content' field is missing or not a string".into())
        })
}

fn reply_model(body: &Value, requested: &str) -> String {
    body.get("model")
        .and_then(Value::as_str)
        .unwrap_or(requested)
        .to_string()
}

#[async_trait]
impl InferenceClient for OllamaClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, InferenceError> {
        debug!(model = %request.model, prompt_len = request.prompt.len(), "generate request");
        let body = self.post("/api/generate", request).await?;
        Ok(GenerateResponse {
            text: generate_text(&body)?,
            model: reply_model(&body, &request.model),
        })
    }

    async fn chat(&self, request: &ChatRequest) -> Result<GenerateResponse, InferenceError> {
        debug!(model = %request.model, messages = request.messages.len(), "chat request");
        let body = self.post("/api/chat", request).await?;
        Ok(GenerateResponse {
            text: chat_text(&body)?,
            model: reply_model(&body, &request.model),
        })
    }
}
