//! Transport-independent API layer.
//!
//! `ModernizerApi` is the single entry point for all caller-facing
//! operations. Transports (MCP, CLI, direct embedding) call its methods;
//! they never reach into the stores or the annotation queue directly.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::annotation::{AnnotationJob, AnnotationOutcome, AnnotationQueue, Annotator, PendingAnnotation};
use crate::config::{EngineConfig, InferenceConfig};
use crate::entity::{field, kind, EntityStore};
use crate::error::{EngineError, EngineResult};
use crate::graph::{ReconcileReport, ReferenceGraph};
use crate::inference::{explain_prompt, GenerateRequest, InferenceClient, OllamaClient};
use crate::instruct::{InMemoryInstructStore, InstructStore};
use crate::query::{PromptDetail, RankedResponse, RankedRetrieval};
use crate::rank::RankEngine;
use crate::retry::{retry_transient, RetryPolicy};
use crate::semantic::{Embedder, SemanticIndex, SimilarMatch};
use crate::storage::{ObjectId, ObjectStore, OpenStore, SqliteStore};

/// Input of a generation.
#[derive(Debug, Clone, Default)]
pub struct GenerateParams {
    pub code: String,
    /// Instruction set to draw from when no literal instruction is given
    pub instruct_type: Option<String>,
    /// Literal instruction; wins over `instruct_type`
    pub instruct: Option<String>,
    pub git_url: Option<String>,
    /// Overrides the configured model
    pub model: Option<String>,
}

impl GenerateParams {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    pub fn instruct_type(mut self, set: impl Into<String>) -> Self {
        self.instruct_type = Some(set.into());
        self
    }

    pub fn instruct(mut self, instruct: impl Into<String>) -> Self {
        self.instruct = Some(instruct.into());
        self
    }

    pub fn git_url(mut self, url: impl Into<String>) -> Self {
        self.git_url = Some(url.into());
        self
    }
}

/// Result of a generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Generated {
    pub prompt_id: ObjectId,
    pub response: String,
    pub instruct: String,
    #[serde(rename = "gitURL")]
    pub git_url: Option<String>,
}

/// Single entry point for all caller-facing operations.
#[derive(Clone)]
pub struct ModernizerApi {
    entities: EntityStore,
    graph: ReferenceGraph,
    ranks: RankEngine,
    retrieval: Arc<RankedRetrieval>,
    index: SemanticIndex,
    instructs: Arc<dyn InstructStore>,
    inference: Arc<dyn InferenceClient>,
    queue: Arc<AnnotationQueue>,
    inference_config: InferenceConfig,
    retry: RetryPolicy,
}

impl ModernizerApi {
    /// Wire every component around shared clients. Spawns the annotation
    /// workers, so it must run inside a tokio runtime.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        inference: Arc<dyn InferenceClient>,
        instructs: Arc<dyn InstructStore>,
        config: &EngineConfig,
    ) -> Self {
        let entities = EntityStore::new(store);
        let graph = ReferenceGraph::new(entities.clone());
        let index = SemanticIndex::new(entities.clone())
            .with_default_certainty(config.semantic.certainty)
            .with_pending_links(graph.pending().clone());
        let retry = config.retry.policy();

        let annotator = Annotator::new(
            entities.clone(),
            graph.clone(),
            index.clone(),
            inference.clone(),
            config.inference.model.clone(),
        )
        .with_retry(RetryPolicy {
            max_attempts: config.annotation.max_attempts,
            ..retry.clone()
        });

        Self {
            ranks: RankEngine::new(entities.clone()).with_max_cas_attempts(config.rank.max_cas_attempts),
            retrieval: Arc::new(RankedRetrieval::new(entities.clone())),
            queue: Arc::new(AnnotationQueue::start(annotator, &config.annotation)),
            entities,
            graph,
            index,
            instructs,
            inference,
            inference_config: config.inference.clone(),
            retry,
        }
    }

    /// SQLite store at `config.db_path` (in memory when unset), HTTP
    /// inference client and the canned instruction sets.
    pub fn from_config(config: &EngineConfig, embedder: Arc<dyn Embedder>) -> EngineResult<Self> {
        let store = match &config.db_path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        EngineError::StoreUnavailable(format!("cannot create {}: {}", parent.display(), e))
                    })?;
                }
                SqliteStore::open(path, embedder)?
            }
            None => SqliteStore::open_in_memory(embedder)?,
        }
        .with_vectorized_field(kind::SEMANTIC_MEANING, field::SEMANTIC_MEANING);

        let inference = OllamaClient::new(&config.inference.base_url, config.inference.timeout)?;
        Ok(Self::new(
            Arc::new(store),
            Arc::new(inference),
            Arc::new(InMemoryInstructStore::with_defaults()),
            config,
        ))
    }

    // --- Write ---

    /// Explain a code fragment, store the Prompt and Response, and queue
    /// its semantic annotation.
    ///
    /// Queue capacity is reserved before anything else: a full queue
    /// rejects the generation with `Backpressure` and stores nothing.
    ///
    /// The Response is stored before the Prompt, so a Prompt never exists
    /// without something to link to. A response link that still fails
    /// after retries is left to `reconcile` and reported as the error; the
    /// Prompt is annotated regardless.
    pub async fn generate(&self, params: GenerateParams) -> EngineResult<Generated> {
        if params.code.trim().is_empty() {
            return Err(EngineError::InvalidInput("code must not be empty".into()));
        }
        let permit = self.queue.try_reserve()?;

        let instruct = match params.instruct.as_deref().map(str::trim) {
            Some(literal) if !literal.is_empty() => literal.to_string(),
            _ => {
                self.instructs
                    .random_member(params.instruct_type.as_deref().unwrap_or_default())
                    .await?
            }
        };
        let git_url = params.git_url.filter(|url| !url.trim().is_empty());
        let model = params
            .model
            .unwrap_or_else(|| self.inference_config.model.clone());

        let request = &GenerateRequest::new(model, explain_prompt(&instruct, &params.code))
            .with_num_ctx(self.inference_config.num_ctx);
        let inference = &self.inference;
        let timeout = self.inference_config.timeout;
        let reply = retry_transient(&self.retry, "generate", || async move {
            tokio::time::timeout(timeout, inference.generate(request))
                .await
                .map_err(|_| EngineError::Timeout(timeout))?
                .map_err(EngineError::from)
        })
        .await?;

        let response_id = self.entities.create_response(&reply.text).await?;
        let prompt_id = self
            .entities
            .create_prompt(&instruct, &params.code, git_url.as_deref())
            .await?;
        let linked = retry_transient(&self.retry, "link response", || {
            self.graph.link_response(&prompt_id, &response_id)
        })
        .await;

        permit.send(AnnotationJob::new(prompt_id.clone(), params.code));
        if let Err(e) = linked {
            warn!(prompt_id = %prompt_id, response_id = %response_id, error = %e, "response link left for reconciliation");
            return Err(e);
        }
        info!(prompt_id = %prompt_id, model = %reply.model, "generated response");

        Ok(Generated {
            prompt_id,
            response: reply.text,
            instruct,
            git_url,
        })
    }

    /// Up- or down-vote a Prompt. Returns the new rank.
    pub async fn vote(&self, prompt_id: &str, upvote: bool) -> EngineResult<i64> {
        self.ranks.vote(&ObjectId::from(prompt_id), upvote.into()).await
    }

    // --- Read ---

    pub async fn best_response(&self, code: &str) -> EngineResult<RankedResponse> {
        self.retrieval.best_response(code).await
    }

    pub async fn random_response(&self, code: &str) -> EngineResult<RankedResponse> {
        self.retrieval.random_response(code).await
    }

    pub async fn response_by_id(&self, prompt_id: &str) -> EngineResult<PromptDetail> {
        self.retrieval.response_by_id(&ObjectId::from(prompt_id)).await
    }

    pub async fn response_list(&self, code: &str) -> EngineResult<Vec<ObjectId>> {
        self.retrieval.response_list(code).await
    }

    pub async fn prompt_count(&self, code: &str) -> EngineResult<usize> {
        self.retrieval.prompt_count(code).await
    }

    /// Source URLs of Prompts whose meaning is similar to `concept`.
    pub async fn similar_by_meaning(&self, concept: &str, certainty: Option<f32>) -> EngineResult<Vec<String>> {
        Ok(self
            .similar_matches(concept, certainty)
            .await?
            .into_iter()
            .map(|m| m.git_url)
            .collect())
    }

    pub async fn similar_matches(&self, concept: &str, certainty: Option<f32>) -> EngineResult<Vec<SimilarMatch>> {
        self.index.similar_by_meaning(concept, certainty).await
    }

    pub async fn has_semantic_meaning(&self, code: &str) -> EngineResult<Option<String>> {
        self.index.has_semantic_meaning(code).await
    }

    // --- Instructions ---

    pub async fn instruct_sets(&self) -> EngineResult<Vec<String>> {
        self.instructs.sets().await
    }

    pub async fn instruct_members(&self, set: &str) -> EngineResult<Vec<String>> {
        self.instructs.members(set).await
    }

    pub async fn add_instruct(&self, set: &str, item: &str) -> EngineResult<bool> {
        self.instructs.add(set, item).await
    }

    pub async fn remove_instruct(&self, set: &str, item: &str) -> EngineResult<bool> {
        self.instructs.remove(set, item).await
    }

    // --- Maintenance ---

    /// Retry every half-finished response and meaning link.
    pub async fn reconcile(&self) -> ReconcileReport {
        self.graph.reconcile().await
    }

    /// Re-queue failed annotation jobs. Returns how many were queued.
    pub fn retry_annotations(&self) -> EngineResult<usize> {
        self.queue.retry_pending()
    }

    pub fn pending_annotations(&self) -> Vec<PendingAnnotation> {
        self.queue.pending()
    }

    pub fn subscribe_annotations(&self) -> broadcast::Receiver<AnnotationOutcome> {
        self.queue.subscribe()
    }

    /// Stop the annotation workers. In-flight jobs are cancelled and kept
    /// as pending.
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }
}
