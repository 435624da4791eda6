//! Embedding backends used by the store to vectorize semantic summaries
//!
//! Trait-based so production code can use Ollama or fastembed while tests
//! use the deterministic hashing embedder.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Error type for embedding operations.
#[derive(Debug)]
pub enum EmbeddingError {
    /// The embedding model returned no results
    EmptyResult,
    /// Model loading or inference failed
    ModelError(String),
    /// The remote embedding endpoint could not be reached
    Request(String),
}

impl fmt::Display for EmbeddingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingError::EmptyResult => write!(f, "embedding returned no results"),
            EmbeddingError::ModelError(msg) => write!(f, "embedding model error: {}", msg),
            EmbeddingError::Request(msg) => write!(f, "embedding request failed: {}", msg),
        }
    }
}

impl std::error::Error for EmbeddingError {}

/// Trait for embedding text into vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifies the model, for logs.
    fn model_name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

// ---------------------------------------------------------------------------
// HashingEmbedder: offline, deterministic
// ---------------------------------------------------------------------------

/// Feature-hashing bag-of-words embedder.
///
/// Lowercased alphanumeric tokens are hashed (FNV-1a) into a fixed number
/// of signed buckets. Texts sharing vocabulary get high cosine similarity;
/// unrelated texts sit near zero. No model, no network.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn fnv1a(token: &str) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in token.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        hash
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);
        for token in tokens {
            let hash = Self::fnv1a(&token);
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(512)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_name(&self) -> &str {
        "hashing"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.vectorize(text))
    }
}

// ---------------------------------------------------------------------------
// OllamaEmbedder: remote embeddings endpoint
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

/// Embedder backed by an Ollama `/api/embeddings` endpoint.
pub struct OllamaEmbedder {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::ModelError(e.to_string()))?;
        if body.embedding.is_empty() {
            return Err(EmbeddingError::EmptyResult);
        }
        Ok(body.embedding)
    }
}

// ---------------------------------------------------------------------------
// FastEmbedEmbedder: local ONNX model behind `embeddings` feature
// ---------------------------------------------------------------------------

#[cfg(feature = "embeddings")]
mod fastembed_impl {
    use super::{Embedder, EmbeddingError};
    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use std::sync::{Arc, Mutex};

    /// Production embedder backed by fastembed (ONNX Runtime).
    ///
    /// `TextEmbedding::embed` needs `&mut self` and is CPU bound, so the
    /// model sits behind a mutex and runs on the blocking pool.
    pub struct FastEmbedEmbedder {
        model: Arc<Mutex<TextEmbedding>>,
        name: String,
    }

    impl FastEmbedEmbedder {
        pub fn new(model: EmbeddingModel) -> Result<Self, EmbeddingError> {
            let name = format!("{:?}", model);
            let options = InitOptions::new(model).with_show_download_progress(false);
            let embedding = TextEmbedding::try_new(options)
                .map_err(|e| EmbeddingError::ModelError(e.to_string()))?;
            Ok(Self {
                model: Arc::new(Mutex::new(embedding)),
                name,
            })
        }

        /// nomic-embed-text-v1.5
        pub fn default_model() -> Result<Self, EmbeddingError> {
            Self::new(EmbeddingModel::NomicEmbedTextV15)
        }
    }

    #[async_trait]
    impl Embedder for FastEmbedEmbedder {
        fn model_name(&self) -> &str {
            &self.name
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let model = Arc::clone(&self.model);
            let text = text.to_string();
            let embeddings = tokio::task::spawn_blocking(move || {
                let mut model = model
                    .lock()
                    .map_err(|e| EmbeddingError::ModelError(e.to_string()))?;
                model
                    .embed(vec![text], None)
                    .map_err(|e| EmbeddingError::ModelError(e.to_string()))
            })
            .await
            .map_err(|e| EmbeddingError::ModelError(e.to_string()))??;
            embeddings.into_iter().next().ok_or(EmbeddingError::EmptyResult)
        }
    }
}

#[cfg(feature = "embeddings")]
pub use fastembed_impl::FastEmbedEmbedder;
