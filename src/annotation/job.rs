//! Annotation jobs and their outcomes

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::storage::ObjectId;

/// Request to attach a semantic meaning to one Prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationJob {
    pub prompt_id: ObjectId,
    pub code: String,
}

impl AnnotationJob {
    pub fn new(prompt_id: ObjectId, code: impl Into<String>) -> Self {
        Self {
            prompt_id,
            code: code.into(),
        }
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnnotationStatus {
    /// A new meaning was generated and linked both ways
    Linked { semantic_meaning: ObjectId },
    /// Identical code already had a meaning; its text was reused without inference
    Reused { semantic_meaning: ObjectId },
    /// The Prompt was already fully linked
    AlreadyLinked { semantic_meaning: ObjectId },
    /// The job gave up; it stays pending for `retry_pending`
    Failed { reason: String },
}

impl AnnotationStatus {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    pub fn semantic_meaning(&self) -> Option<&ObjectId> {
        match self {
            Self::Linked { semantic_meaning }
            | Self::Reused { semantic_meaning }
            | Self::AlreadyLinked { semantic_meaning } => Some(semantic_meaning),
            Self::Failed { .. } => None,
        }
    }
}

/// Published on the outcome channel once per finished job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationOutcome {
    pub prompt_id: ObjectId,
    #[serde(flatten)]
    pub status: AnnotationStatus,
}

/// A failed job awaiting retry.
#[derive(Debug, Clone, Serialize)]
pub struct PendingAnnotation {
    pub job: AnnotationJob,
    pub failures: u32,
    pub last_error: String,
    pub last_failed_at: DateTime<Utc>,
}
