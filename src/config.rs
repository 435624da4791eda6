//! Engine configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::rank::DEFAULT_MAX_CAS_ATTEMPTS;
use crate::retry::RetryPolicy;
use crate::semantic::DEFAULT_CERTAINTY;

pub const ENV_OLLAMA_URL: &str = "OLLAMA_URL";
pub const ENV_OLLAMA_MODEL: &str = "OLLAMA_MODEL";
pub const ENV_DB_PATH: &str = "MODERNIZER_DB";

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub base_url: String,
    pub model: String,
    /// Context window sent as `options.num_ctx`
    pub num_ctx: Option<u32>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "codellama:13b-instruct".to_string(),
            num_ctx: None,
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnnotationConfig {
    /// Worker tasks in the pool
    pub workers: usize,
    /// Jobs waiting beyond this many are rejected
    pub queue_capacity: usize,
    /// Upper bound for a job's lookup and inference; writes after that always finish
    pub job_timeout: Duration,
    /// Attempts per job for transient failures
    pub max_attempts: u32,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 64,
            job_timeout: Duration::from_secs(180),
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RankConfig {
    pub max_cas_attempts: u32,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            max_cas_attempts: DEFAULT_MAX_CAS_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay: policy.base_delay,
            max_delay: policy.max_delay,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            max_delay: self.max_delay,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SemanticConfig {
    /// Default minimum certainty for meaning-similarity search
    pub certainty: f32,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            certainty: DEFAULT_CERTAINTY,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Database path; `None` keeps everything in memory
    pub db_path: Option<PathBuf>,
    pub inference: InferenceConfig,
    pub annotation: AnnotationConfig,
    pub rank: RankConfig,
    pub retry: RetryConfig,
    pub semantic: SemanticConfig,
}

impl EngineConfig {
    /// Defaults overridden by `OLLAMA_URL`, `OLLAMA_MODEL` and `MODERNIZER_DB`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_OLLAMA_URL) {
            config.inference.base_url = url;
        }
        if let Some(model) = non_empty(ENV_OLLAMA_MODEL) {
            config.inference.model = model;
        }
        if let Some(path) = non_empty(ENV_DB_PATH) {
            config.db_path = Some(PathBuf::from(path));
        }
        config
    }
}
