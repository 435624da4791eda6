//! Annotator: the steps of one annotation job

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::job::{AnnotationJob, AnnotationStatus};
use crate::config::AnnotationConfig;
use crate::entity::EntityStore;
use crate::error::{EngineError, EngineResult};
use crate::graph::{LinkStage, MeaningLinkState, ReferenceGraph};
use crate::inference::{semantic_request, InferenceClient};
use crate::retry::{retry_transient, RetryPolicy};
use crate::semantic::SemanticIndex;
use crate::storage::ObjectId;

/// Produces and links the semantic meaning for a Prompt.
#[derive(Clone)]
pub struct Annotator {
    entities: EntityStore,
    graph: ReferenceGraph,
    index: SemanticIndex,
    inference: Arc<dyn InferenceClient>,
    model: String,
    retry: RetryPolicy,
    job_timeout: Duration,
}

impl Annotator {
    pub fn new(
        entities: EntityStore,
        graph: ReferenceGraph,
        index: SemanticIndex,
        inference: Arc<dyn InferenceClient>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            entities,
            graph,
            index,
            inference,
            model: model.into(),
            retry: RetryPolicy::default(),
            job_timeout: AnnotationConfig::default().job_timeout,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Bound on lookup and inference. Store writes after that are not cut short.
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// Annotate one Prompt.
    ///
    /// A Prompt that already has a meaning is only repaired, never
    /// re-annotated, and a meaning left behind by an interrupted attempt
    /// is linked instead of inferring a new one. Identical code reuses the
    /// stored text.
    ///
    /// `token` and the job timeout stop the job only before its meaning is
    /// stored. From then on the meaning is in the pending ledger and the
    /// job runs to completion.
    pub async fn annotate(
        &self,
        job: &AnnotationJob,
        token: &CancellationToken,
    ) -> EngineResult<AnnotationStatus> {
        let prompt = &job.prompt_id;

        match self.graph.meaning_link_state(prompt).await? {
            MeaningLinkState::Linked(semantic_meaning) => {
                return Ok(AnnotationStatus::AlreadyLinked { semantic_meaning });
            }
            MeaningLinkState::HalfLinked(semantic_meaning) => {
                self.link(prompt, &semantic_meaning).await?;
                info!(prompt_id = %prompt, semantic_meaning_id = %semantic_meaning, "repaired half-linked meaning");
                return Ok(AnnotationStatus::Linked { semantic_meaning });
            }
            MeaningLinkState::Absent => {}
        }

        if let Some(leftover) = self.graph.pending().meaning_for(prompt) {
            let semantic_meaning = leftover.target;
            self.link(prompt, &semantic_meaning).await?;
            info!(prompt_id = %prompt, semantic_meaning_id = %semantic_meaning, "linked meaning of an earlier attempt");
            return Ok(AnnotationStatus::Linked { semantic_meaning });
        }

        let (text, reused) = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(EngineError::Cancelled),
            result = tokio::time::timeout(self.job_timeout, self.meaning_text(job)) => {
                result.unwrap_or(Err(EngineError::Timeout(self.job_timeout)))?
            }
        };

        // Not retried: a create that timed out may still have landed
        let semantic_meaning = self.entities.create_semantic_meaning(&text).await?;
        self.graph
            .pending()
            .open(prompt, &semantic_meaning, LinkStage::Forward);

        self.link(prompt, &semantic_meaning).await?;
        info!(prompt_id = %prompt, semantic_meaning_id = %semantic_meaning, reused, "annotated prompt");

        Ok(if reused {
            AnnotationStatus::Reused { semantic_meaning }
        } else {
            AnnotationStatus::Linked { semantic_meaning }
        })
    }

    /// Stored meaning of identical code, or a freshly inferred one.
    async fn meaning_text(&self, job: &AnnotationJob) -> EngineResult<(String, bool)> {
        let existing = retry_transient(&self.retry, "semantic lookup", || {
            self.index.has_semantic_meaning(&job.code)
        })
        .await?;
        match existing {
            Some(text) => {
                debug!(prompt_id = %job.prompt_id, "reusing semantic meaning of identical code");
                Ok((text, true))
            }
            None => Ok((self.infer(job).await?, false)),
        }
    }

    async fn infer(&self, job: &AnnotationJob) -> EngineResult<String> {
        let request = &semantic_request(&self.model, &job.code);
        let inference = &self.inference;
        let reply = retry_transient(&self.retry, "semantic inference", || async move {
            inference.chat(request).await.map_err(EngineError::from)
        })
        .await?;

        let text = reply.text.trim();
        if text.is_empty() {
            return Err(EngineError::data_format("semanticMeaning", "inference returned empty text"));
        }
        Ok(text.to_string())
    }

    async fn link(&self, prompt: &ObjectId, semantic_meaning: &ObjectId) -> EngineResult<()> {
        retry_transient(&self.retry, "link semantic meaning", || {
            self.graph.link_meaning(prompt, semantic_meaning)
        })
        .await
    }
}
