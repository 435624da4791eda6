//! Engine-level error type shared by every component

use std::time::Duration;
use thiserror::Error;

use crate::inference::InferenceError;
use crate::storage::{ObjectId, StorageError};

/// Errors that can occur in engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Data format error in field '{field}': {detail}")]
    DataFormat { field: String, detail: String },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Inference unavailable: {0}")]
    InferenceUnavailable(String),

    #[error("Partial link: prompt {prompt} -> semantic meaning {semantic_meaning} is missing its back-link: {reason}")]
    PartialLink {
        prompt: ObjectId,
        semantic_meaning: ObjectId,
        reason: String,
    },

    #[error("Prompt {0} has no linked response")]
    MissingResponse(ObjectId),

    #[error("Prompt {0} already has a response")]
    ResponseAlreadyLinked(ObjectId),

    #[error("Rank update for {prompt} gave up after {attempts} conflicting writes")]
    Contention { prompt: ObjectId, attempts: u32 },

    #[error("Annotation queue is full (capacity {0})")]
    Backpressure(usize),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown instruct set: {0}")]
    UnknownInstructSet(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cancelled")]
    Cancelled,
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub(crate) fn data_format(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::DataFormat {
            field: field.into(),
            detail: detail.into(),
        }
    }

    /// Errors caused by the caller's input (4xx class). Everything else is
    /// a server-side failure (5xx class).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::InvalidInput(_) | Self::UnknownInstructSet(_)
        )
    }

    /// Failures worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::InferenceUnavailable(_) | Self::Timeout(_)
        )
    }
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ObjectNotFound(id) => Self::NotFound(id),
            StorageError::Serialization(e) => Self::data_format("properties", e.to_string()),
            StorageError::DateParse(e) => Self::data_format("created_at", e),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<InferenceError> for EngineError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::Malformed(detail) => Self::data_format("response", detail),
            other => Self::InferenceUnavailable(other.to_string()),
        }
    }
}
