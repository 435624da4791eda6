//! Inference service client
//!
//! Defines the client trait and request/response types for the text
//! generation service. Two implementations:
//! - `OllamaClient`: HTTP client for an Ollama-compatible endpoint (production)
//! - `MockInference`: returns preconfigured replies (testing)

mod ollama;

pub use ollama::OllamaClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Instruction sent with every semantic-meaning request.
pub const SEMANTIC_INSTRUCTION: &str =
    "What is the semantic meaning of this code? Answer in one or two sentences.";

/// Full generation prompt: instruction and code joined by a space.
pub fn explain_prompt(instruct: &str, code: &str) -> String {
    format!("{} {}", instruct, code)
}

/// Chat request asking for the semantic meaning of `code`.
pub fn semantic_request(model: &str, code: &str) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::user(format!("{}\n\n{}", SEMANTIC_INSTRUCTION, code))],
        stream: false,
        options: None,
    }
}

/// Model options sent alongside a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Context window size in tokens
    pub num_ctx: u32,
}

/// Single-prompt completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            stream: false,
            options: None,
        }
    }

    pub fn with_num_ctx(mut self, num_ctx: Option<u32>) -> Self {
        self.options = num_ctx.map(|num_ctx| GenerateOptions { num_ctx });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat-style request carrying a message list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

/// Generated text, whichever call form produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub text: String,
    pub model: String,
}

/// Errors from inference client operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InferenceError {
    #[error("inference service not available: {0}")]
    Unavailable(String),
    #[error("inference service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed inference reply: {0}")]
    Malformed(String),
}

/// Client trait for the inference service.
///
/// Abstracts over transport (HTTP, mock) so callers don't depend on how
/// the service is reached.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Complete a single prompt.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, InferenceError>;

    /// Complete a chat conversation.
    async fn chat(&self, request: &ChatRequest) -> Result<GenerateResponse, InferenceError>;
}

/// Mock client for testing: returns preconfigured replies.
///
/// `generate` answers with the explanation reply, `chat` with the
/// semantic reply. Queued failures are returned before any reply.
pub struct MockInference {
    reply: String,
    semantic_reply: String,
    generate_failures: Mutex<VecDeque<InferenceError>>,
    chat_failures: Mutex<VecDeque<InferenceError>>,
    delay: Option<Duration>,
    generate_calls: AtomicUsize,
    chat_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl Default for MockInference {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInference {
    pub fn new() -> Self {
        Self {
            reply: "This code prints a value.".to_string(),
            semantic_reply: "Prints a value to standard output.".to_string(),
            generate_failures: Mutex::new(VecDeque::new()),
            chat_failures: Mutex::new(VecDeque::new()),
            delay: None,
            generate_calls: AtomicUsize::new(0),
            chat_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = reply.into();
        self
    }

    pub fn with_semantic_reply(mut self, reply: impl Into<String>) -> Self {
        self.semantic_reply = reply.into();
        self
    }

    /// Fail the next `times` generate calls with `error`.
    pub fn failing_generate(self, times: usize, error: InferenceError) -> Self {
        self.generate_failures
            .lock()
            .unwrap()
            .extend(std::iter::repeat(error).take(times));
        self
    }

    /// Fail the next `times` chat calls with `error`.
    pub fn failing_chat(self, times: usize, error: InferenceError) -> Self {
        self.chat_failures
            .lock()
            .unwrap()
            .extend(std::iter::repeat(error).take(times));
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    /// Every prompt received by `generate`, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl InferenceClient for MockInference {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, InferenceError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        self.pause().await;

        if let Some(error) = self.generate_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(GenerateResponse {
            text: self.reply.clone(),
            model: request.model.clone(),
        })
    }

    async fn chat(&self, request: &ChatRequest) -> Result<GenerateResponse, InferenceError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if let Some(error) = self.chat_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(GenerateResponse {
            text: self.semantic_reply.clone(),
            model: request.model.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_request_serializes_like_the_wire_format() {
        let request = GenerateRequest::new("codellama", "Explain: print('x')").with_num_ctx(Some(4096));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "codellama",
                "prompt": "Explain: print('x')",
                "stream": false,
                "options": { "num_ctx": 4096 }
            })
        );

        let bare = serde_json::to_value(GenerateRequest::new("m", "p")).unwrap();
        assert!(bare.get("options").is_none());
    }

    #[test]
    fn semantic_request_carries_instruction_and_code() {
        let request = semantic_request("codellama", "print('x')");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
        assert!(request.messages[0].content.starts_with(SEMANTIC_INSTRUCTION));
        assert!(request.messages[0].content.ends_with("print('x')"));
        assert!(!request.stream);
    }

    #[test]
    fn explain_prompt_joins_with_a_space() {
        assert_eq!(explain_prompt("Explain:", "x = 1"), "Explain: x = 1");
    }

    #[tokio::test]
    async fn mock_fails_then_recovers() {
        let mock = MockInference::new()
            .with_reply("ok")
            .failing_generate(2, InferenceError::Unavailable("down".into()));
        let request = GenerateRequest::new("m", "p");

        assert!(mock.generate(&request).await.is_err());
        assert!(mock.generate(&request).await.is_err());
        assert_eq!(mock.generate(&request).await.unwrap().text, "ok");
        assert_eq!(mock.generate_calls(), 3);
        assert_eq!(mock.prompts(), vec!["p", "p", "p"]);
    }

    #[tokio::test]
    async fn mock_chat_answers_with_semantic_reply() {
        let mock = MockInference::new().with_semantic_reply("adds numbers");
        let reply = mock.chat(&semantic_request("m", "a + b")).await.unwrap();
        assert_eq!(reply.text, "adds numbers");
        assert_eq!(mock.chat_calls(), 1);
        assert_eq!(mock.generate_calls(), 0);
    }
}
