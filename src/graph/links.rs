//! ReferenceGraph: directed links between entities

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::pending::{LinkStage, PendingLink, PendingLinks};
use crate::entity::{reference, EntityStore};
use crate::error::{EngineError, EngineResult};
use crate::storage::ObjectId;

/// State of a prompt's link to its semantic meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MeaningLinkState {
    /// No semantic meaning yet
    Absent,
    /// Both directions present
    Linked(ObjectId),
    /// Prompt → SemanticMeaning exists but the back-link is missing
    HalfLinked(ObjectId),
}

/// Outcome of a reconciliation pass over the pending ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub repaired: usize,
    /// Meanings dropped because their prompt was linked to another one
    pub discarded: usize,
    pub still_pending: usize,
}

/// Creates and replaces references between Prompt, Response and
/// SemanticMeaning objects.
///
/// Each method is one remote write. `link_response` and `link_meaning`
/// record failures in the pending ledger so `reconcile` can finish them
/// later.
#[derive(Clone)]
pub struct ReferenceGraph {
    entities: EntityStore,
    pending: Arc<PendingLinks>,
}

impl ReferenceGraph {
    pub fn new(entities: EntityStore) -> Self {
        Self {
            entities,
            pending: Arc::new(PendingLinks::new()),
        }
    }

    /// Incomplete links awaiting reconciliation.
    pub fn pending(&self) -> &Arc<PendingLinks> {
        &self.pending
    }

    /// Link a prompt to its response. A prompt's response never changes:
    /// relinking the same response is a no-op, a different one is rejected.
    pub async fn link_prompt_to_response(
        &self,
        prompt: &ObjectId,
        response: &ObjectId,
    ) -> EngineResult<()> {
        let store = self.entities.store();
        let existing = store.references(prompt, reference::HAS_RESPONSE).await?;
        match existing.first() {
            Some(current) if current == response => return Ok(()),
            Some(_) => return Err(EngineError::ResponseAlreadyLinked(prompt.clone())),
            None => {}
        }

        store
            .set_reference(prompt, reference::HAS_RESPONSE, response)
            .await?;
        debug!(prompt_id = %prompt, response_id = %response, "linked response");
        Ok(())
    }

    /// `link_prompt_to_response`, with a failure recorded for `reconcile`.
    pub async fn link_response(&self, prompt: &ObjectId, response: &ObjectId) -> EngineResult<()> {
        match self.link_prompt_to_response(prompt, response).await {
            Ok(()) => {
                self.pending.resolve(response);
                Ok(())
            }
            Err(e) => {
                warn!(prompt_id = %prompt, response_id = %response, error = %e, "response link failed");
                self.pending
                    .record(prompt, response, LinkStage::Response, e.to_string());
                Err(e)
            }
        }
    }

    /// Point a prompt at its semantic meaning, replacing any previous one.
    pub async fn link_prompt_to_semantic_meaning(
        &self,
        prompt: &ObjectId,
        semantic_meaning: &ObjectId,
    ) -> EngineResult<()> {
        self.entities
            .store()
            .set_reference(prompt, reference::HAS_SEMANTIC_MEANING, semantic_meaning)
            .await?;
        Ok(())
    }

    /// Point a semantic meaning back at its prompt.
    pub async fn link_semantic_meaning_to_prompt(
        &self,
        semantic_meaning: &ObjectId,
        prompt: &ObjectId,
    ) -> EngineResult<()> {
        self.entities
            .store()
            .set_reference(semantic_meaning, reference::HAS_PROMPT, prompt)
            .await?;
        Ok(())
    }

    /// Establish both directions of the meaning link.
    ///
    /// A failed forward write leaves nothing linked; a failed back-link
    /// leaves the graph half-linked and returns `PartialLink`. Both cases
    /// are recorded for `reconcile`.
    pub async fn link_meaning(
        &self,
        prompt: &ObjectId,
        semantic_meaning: &ObjectId,
    ) -> EngineResult<()> {
        if let Err(e) = self
            .link_prompt_to_semantic_meaning(prompt, semantic_meaning)
            .await
        {
            warn!(prompt_id = %prompt, semantic_meaning_id = %semantic_meaning, error = %e, "meaning link failed");
            self.pending
                .record(prompt, semantic_meaning, LinkStage::Forward, e.to_string());
            return Err(e);
        }

        if let Err(e) = self
            .link_semantic_meaning_to_prompt(semantic_meaning, prompt)
            .await
        {
            warn!(prompt_id = %prompt, semantic_meaning_id = %semantic_meaning, error = %e, "meaning back-link failed, graph is half-linked");
            self.pending
                .record(prompt, semantic_meaning, LinkStage::BackLink, e.to_string());
            return Err(EngineError::PartialLink {
                prompt: prompt.clone(),
                semantic_meaning: semantic_meaning.clone(),
                reason: e.to_string(),
            });
        }

        self.pending.resolve(semantic_meaning);
        debug!(prompt_id = %prompt, semantic_meaning_id = %semantic_meaning, "linked semantic meaning");
        Ok(())
    }

    /// Inspect both directions of a prompt's meaning link.
    pub async fn meaning_link_state(&self, prompt: &ObjectId) -> EngineResult<MeaningLinkState> {
        let record = self.entities.fetch_prompt(prompt).await?;
        let Some(semantic_meaning) = record.semantic_meaning_ids.first() else {
            return Ok(MeaningLinkState::Absent);
        };

        let meaning = self.entities.fetch_semantic_meaning(semantic_meaning).await?;
        if meaning.prompt_ids.contains(prompt) {
            Ok(MeaningLinkState::Linked(semantic_meaning.clone()))
        } else {
            Ok(MeaningLinkState::HalfLinked(semantic_meaning.clone()))
        }
    }

    /// Retry every pending link once.
    ///
    /// A pending meaning whose prompt has since been linked to a different
    /// one is deleted instead, so it never surfaces without a back-link.
    pub async fn reconcile(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for link in self.pending.snapshot() {
            let result = match link.stage {
                LinkStage::Response => self.link_response(&link.prompt, &link.target).await.map(|_| true),
                LinkStage::Forward | LinkStage::BackLink => self.reconcile_meaning(&link).await,
            };

            match result {
                Ok(true) => report.repaired += 1,
                Ok(false) => report.discarded += 1,
                Err(_) => {}
            }
        }

        report.still_pending = self.pending.len();
        if report.repaired > 0 || report.discarded > 0 || report.still_pending > 0 {
            info!(
                repaired = report.repaired,
                discarded = report.discarded,
                still_pending = report.still_pending,
                "reconciled pending links"
            );
        }
        report
    }

    /// `Ok(true)` when linked, `Ok(false)` when the entry was stale.
    async fn reconcile_meaning(&self, link: &PendingLink) -> EngineResult<bool> {
        let state = match self.meaning_link_state(&link.prompt).await {
            Ok(state) => state,
            Err(e) => {
                self.pending
                    .record(&link.prompt, &link.target, link.stage, e.to_string());
                return Err(e);
            }
        };

        match state {
            MeaningLinkState::Linked(current) | MeaningLinkState::HalfLinked(current)
                if current != link.target =>
            {
                if let Err(e) = self.entities.store().delete_object(&link.target).await {
                    let e = EngineError::from(e);
                    self.pending
                        .record(&link.prompt, &link.target, link.stage, e.to_string());
                    return Err(e);
                }
                self.pending.resolve(&link.target);
                info!(prompt_id = %link.prompt, semantic_meaning_id = %link.target, linked = %current, "discarded superseded semantic meaning");
                Ok(false)
            }
            MeaningLinkState::Linked(_) => {
                self.pending.resolve(&link.target);
                Ok(true)
            }
            _ => self.link_meaning(&link.prompt, &link.target).await.map(|_| true),
        }
    }
}
