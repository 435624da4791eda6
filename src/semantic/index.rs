//! SemanticIndex: exact-code meaning lookup and meaning-similarity search

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::entity::{field, kind, EntityStore, PromptRecord, SemanticMeaningRecord};
use crate::error::{EngineError, EngineResult};
use crate::graph::PendingLinks;
use crate::storage::{ObjectId, SimilarityQuery, TextQuery};

/// Default minimum certainty for meaning-similarity matches.
pub const DEFAULT_CERTAINTY: f32 = 0.8;

/// A Prompt reached through a similar SemanticMeaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarMatch {
    /// Empty when the Prompt has no source URL
    #[serde(rename = "gitURL")]
    pub git_url: String,
    pub prompt_id: ObjectId,
    pub semantic_meaning_id: ObjectId,
    pub certainty: f32,
}

#[derive(Clone)]
pub struct SemanticIndex {
    entities: EntityStore,
    default_certainty: f32,
    pending: Option<Arc<PendingLinks>>,
}

impl SemanticIndex {
    pub fn new(entities: EntityStore) -> Self {
        Self {
            entities,
            default_certainty: DEFAULT_CERTAINTY,
            pending: None,
        }
    }

    /// Meanings still being linked are skipped by similarity searches
    /// instead of failing them.
    pub fn with_pending_links(mut self, pending: Arc<PendingLinks>) -> Self {
        self.pending = Some(pending);
        self
    }

    pub fn with_default_certainty(mut self, certainty: f32) -> Self {
        self.default_certainty = certainty;
        self
    }

    pub fn default_certainty(&self) -> f32 {
        self.default_certainty
    }

    /// Semantic meaning already stored for exactly this code, if any.
    pub async fn has_semantic_meaning(&self, code: &str) -> EngineResult<Option<String>> {
        let query = TextQuery::equal(kind::PROMPT, field::CODE, code);
        let objects = self.entities.store().query_text(&query).await?;

        for object in &objects {
            let prompt = PromptRecord::from_object(object)?;
            if let Some(meaning_id) = prompt.semantic_meaning_ids.first() {
                let meaning = self.linked_meaning(&prompt.id, meaning_id).await?;
                debug!(prompt_id = %prompt.id, semantic_meaning_id = %meaning_id, "found existing semantic meaning");
                return Ok(Some(meaning.semantic_meaning));
            }
        }
        Ok(None)
    }

    /// Prompts whose semantic meaning is similar to `concept`, most
    /// certain first. Nothing above the threshold gives an empty list.
    pub async fn similar_by_meaning(
        &self,
        concept: &str,
        certainty: Option<f32>,
    ) -> EngineResult<Vec<SimilarMatch>> {
        let certainty = certainty.unwrap_or(self.default_certainty);
        if !(0.0..=1.0).contains(&certainty) {
            return Err(EngineError::InvalidInput(format!(
                "certainty must be within [0, 1], got {}",
                certainty
            )));
        }

        let query = SimilarityQuery::new(kind::SEMANTIC_MEANING, field::SEMANTIC_MEANING, concept, certainty);
        let scored = self.entities.store().query_similar(&query).await?;

        let mut matches = Vec::with_capacity(scored.len());
        for hit in scored {
            let meaning = SemanticMeaningRecord::from_object(&hit.object)?;
            let Some(prompt_id) = meaning.prompt_ids.first().cloned() else {
                if self.is_pending(&meaning.id) {
                    debug!(semantic_meaning_id = %meaning.id, "skipping meaning that is still being linked");
                    continue;
                }
                return Err(EngineError::data_format(
                    "hasPrompt",
                    format!("semantic meaning {} has no back-link to a prompt", meaning.id),
                ));
            };
            let prompt = match self.entities.fetch_prompt(&prompt_id).await {
                Ok(prompt) => prompt,
                Err(EngineError::NotFound(_)) => {
                    return Err(EngineError::data_format(
                        "hasPrompt",
                        format!("semantic meaning {} links to missing prompt {}", meaning.id, prompt_id),
                    ))
                }
                Err(e) => return Err(e),
            };

            matches.push(SimilarMatch {
                git_url: prompt.git_url.unwrap_or_default(),
                prompt_id,
                semantic_meaning_id: meaning.id,
                certainty: hit.certainty,
            });
        }

        debug!(concept, certainty, matches = matches.len(), "meaning similarity search");
        Ok(matches)
    }

    fn is_pending(&self, meaning: &ObjectId) -> bool {
        self.pending.as_ref().is_some_and(|p| p.contains(meaning))
    }

    async fn linked_meaning(
        &self,
        prompt: &ObjectId,
        meaning: &ObjectId,
    ) -> EngineResult<SemanticMeaningRecord> {
        match self.entities.fetch_semantic_meaning(meaning).await {
            Err(EngineError::NotFound(_)) => Err(EngineError::data_format(
                "hasSemanticMeaning",
                format!("prompt {} links to missing semantic meaning {}", prompt, meaning),
            )),
            other => other,
        }
    }
}
