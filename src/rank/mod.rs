//! Rank engine: vote-driven rank updates
//!
//! A vote is a compare-and-swap on the Prompt's version token. A conflicting
//! write makes the vote refetch and retry, so concurrent votes never clobber
//! each other.

use serde_json::json;
use tracing::{debug, warn};

use crate::entity::{field, EntityStore};
use crate::error::{EngineError, EngineResult};
use crate::storage::{ObjectId, Properties};

/// Default number of compare-and-swap attempts before giving up.
pub const DEFAULT_MAX_CAS_ATTEMPTS: u32 = 16;

/// Direction of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Up,
    Down,
}

impl Vote {
    pub fn delta(self) -> i64 {
        match self {
            Vote::Up => 1,
            Vote::Down => -1,
        }
    }
}

impl From<bool> for Vote {
    fn from(upvote: bool) -> Self {
        if upvote {
            Vote::Up
        } else {
            Vote::Down
        }
    }
}

#[derive(Clone)]
pub struct RankEngine {
    entities: EntityStore,
    max_cas_attempts: u32,
}

impl RankEngine {
    pub fn new(entities: EntityStore) -> Self {
        Self {
            entities,
            max_cas_attempts: DEFAULT_MAX_CAS_ATTEMPTS,
        }
    }

    pub fn with_max_cas_attempts(mut self, attempts: u32) -> Self {
        self.max_cas_attempts = attempts.max(1);
        self
    }

    /// Apply a vote and return the new rank.
    pub async fn vote(&self, prompt: &ObjectId, vote: Vote) -> EngineResult<i64> {
        for attempt in 1..=self.max_cas_attempts {
            let record = self.entities.fetch_prompt(prompt).await?;
            let new_rank = record.rank.checked_add(vote.delta()).ok_or_else(|| {
                EngineError::InvalidInput(format!("rank of {} is already at its limit", prompt))
            })?;

            let mut patch = Properties::new();
            patch.insert(field::RANK.into(), json!(new_rank));

            let applied = self
                .entities
                .store()
                .merge_properties_if_version(prompt, record.version, patch)
                .await?;

            if applied {
                debug!(prompt_id = %prompt, rank = new_rank, attempt, "vote applied");
                return Ok(new_rank);
            }
            debug!(prompt_id = %prompt, attempt, "rank changed underneath vote, retrying");
        }

        warn!(prompt_id = %prompt, attempts = self.max_cas_attempts, "vote abandoned");
        Err(EngineError::Contention {
            prompt: prompt.clone(),
            attempts: self.max_cas_attempts,
        })
    }

    pub async fn rank_of(&self, prompt: &ObjectId) -> EngineResult<i64> {
        Ok(self.entities.fetch_prompt(prompt).await?.rank)
    }
}
