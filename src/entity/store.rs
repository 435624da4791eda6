//! EntityStore: creates and fetches entities, owns ID assignment

use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::types::{PromptRecord, ResponseRecord, SemanticMeaningRecord};
use super::{field, kind, INITIAL_RANK};
use crate::error::{EngineError, EngineResult};
use crate::storage::{ObjectId, ObjectStore, Properties};

/// Typed access to Prompt, Response and SemanticMeaning objects.
///
/// Cheap to clone; every component holds its own handle to the same
/// process-wide store client.
#[derive(Clone)]
pub struct EntityStore {
    store: Arc<dyn ObjectStore>,
}

impl EntityStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// The underlying object store.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Create a Prompt with `rank = 1`.
    pub async fn create_prompt(
        &self,
        instruct: &str,
        code: &str,
        git_url: Option<&str>,
    ) -> EngineResult<ObjectId> {
        let mut properties = Properties::new();
        properties.insert(field::INSTRUCT.into(), json!(instruct));
        properties.insert(field::CODE.into(), json!(code));
        properties.insert(field::RANK.into(), json!(INITIAL_RANK));
        if let Some(url) = git_url {
            properties.insert(field::GIT_URL.into(), json!(url));
        }

        let id = self.store.create_object(kind::PROMPT, properties).await?;
        debug!(prompt_id = %id, "created prompt");
        Ok(id)
    }

    pub async fn create_response(&self, text: &str) -> EngineResult<ObjectId> {
        let mut properties = Properties::new();
        properties.insert(field::RESPONSE.into(), json!(text));
        let id = self.store.create_object(kind::RESPONSE, properties).await?;
        debug!(response_id = %id, "created response");
        Ok(id)
    }

    pub async fn create_semantic_meaning(&self, text: &str) -> EngineResult<ObjectId> {
        let mut properties = Properties::new();
        properties.insert(field::SEMANTIC_MEANING.into(), json!(text));
        let id = self.store.create_object(kind::SEMANTIC_MEANING, properties).await?;
        debug!(semantic_meaning_id = %id, "created semantic meaning");
        Ok(id)
    }

    pub async fn fetch_prompt(&self, id: &ObjectId) -> EngineResult<PromptRecord> {
        let object = self
            .store
            .fetch_object(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("prompt {}", id)))?;
        PromptRecord::from_object(&object)
    }

    pub async fn fetch_response(&self, id: &ObjectId) -> EngineResult<ResponseRecord> {
        let object = self
            .store
            .fetch_object(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("response {}", id)))?;
        ResponseRecord::from_object(&object)
    }

    pub async fn fetch_semantic_meaning(&self, id: &ObjectId) -> EngineResult<SemanticMeaningRecord> {
        let object = self
            .store
            .fetch_object(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("semantic meaning {}", id)))?;
        SemanticMeaningRecord::from_object(&object)
    }
}
