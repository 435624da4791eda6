//! Ledger of links that did not complete

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::storage::ObjectId;

/// Which write is still outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStage {
    /// Prompt → Response
    Response,
    /// SemanticMeaning exists; neither direction written
    Forward,
    /// Prompt → SemanticMeaning exists, SemanticMeaning → Prompt missing
    BackLink,
}

impl LinkStage {
    pub fn is_meaning(self) -> bool {
        matches!(self, Self::Forward | Self::BackLink)
    }
}

/// A link from a Prompt to `target` (a Response or SemanticMeaning) that
/// is not complete yet.
#[derive(Debug, Clone, Serialize)]
pub struct PendingLink {
    pub prompt: ObjectId,
    pub target: ObjectId,
    pub stage: LinkStage,
    /// Failed attempts so far; 0 while the first attempt is in flight
    pub attempts: u32,
    pub last_error: String,
    pub since: DateTime<Utc>,
}

/// Pending links keyed by target ID.
#[derive(Debug, Default)]
pub struct PendingLinks {
    links: DashMap<ObjectId, PendingLink>,
}

impl PendingLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a link before attempting it, so a caller that gives up half
    /// way leaves the work behind. An existing entry is kept as is.
    pub fn open(&self, prompt: &ObjectId, target: &ObjectId, stage: LinkStage) {
        self.links
            .entry(target.clone())
            .or_insert_with(|| PendingLink {
                prompt: prompt.clone(),
                target: target.clone(),
                stage,
                attempts: 0,
                last_error: String::new(),
                since: Utc::now(),
            });
    }

    /// Record a failed attempt. Repeated failures for the same target bump
    /// the attempt count and keep the original timestamp.
    pub fn record(
        &self,
        prompt: &ObjectId,
        target: &ObjectId,
        stage: LinkStage,
        error: impl Into<String>,
    ) {
        let error = error.into();
        self.links
            .entry(target.clone())
            .and_modify(|link| {
                link.stage = stage;
                link.attempts += 1;
                link.last_error = error.clone();
            })
            .or_insert_with(|| PendingLink {
                prompt: prompt.clone(),
                target: target.clone(),
                stage,
                attempts: 1,
                last_error: error,
                since: Utc::now(),
            });
    }

    /// Drop an entry once its link is complete. Returns whether it existed.
    pub fn resolve(&self, target: &ObjectId) -> bool {
        self.links.remove(target).is_some()
    }

    pub fn get(&self, target: &ObjectId) -> Option<PendingLink> {
        self.links.get(target).map(|r| r.clone())
    }

    pub fn contains(&self, target: &ObjectId) -> bool {
        self.links.contains_key(target)
    }

    /// The unfinished semantic meaning link of a prompt, if any.
    pub fn meaning_for(&self, prompt: &ObjectId) -> Option<PendingLink> {
        self.links
            .iter()
            .find(|r| r.stage.is_meaning() && &r.prompt == prompt)
            .map(|r| r.value().clone())
    }

    /// Copy of every entry, so callers can retry without holding shard locks.
    pub fn snapshot(&self) -> Vec<PendingLink> {
        self.links.iter().map(|r| r.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
