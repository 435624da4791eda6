//! RankedRetrieval: read-only lookups of responses by code fragment

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::Mutex;
use tracing::debug;

use super::select::{select_best, select_random};
use crate::entity::{field, kind, EntityStore, PromptRecord};
use crate::error::{EngineError, EngineResult};
use crate::storage::{ObjectId, TextQuery};

/// A selected Prompt and its response text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResponse {
    pub prompt_id: ObjectId,
    pub instruct: String,
    pub response: String,
}

/// Everything known about one Prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptDetail {
    pub prompt_id: ObjectId,
    pub instruct: String,
    pub response: String,
    pub rank: i64,
    pub code: String,
    #[serde(rename = "gitURL")]
    pub git_url: Option<String>,
}

/// Fuzzy code lookups with rank-aware selection.
///
/// Ranks come from the query result itself. A vote landing between the
/// query and the selection is not seen by that call.
pub struct RankedRetrieval {
    entities: EntityStore,
    rng: Mutex<StdRng>,
}

impl RankedRetrieval {
    pub fn new(entities: EntityStore) -> Self {
        Self {
            entities,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic tie-breaks, for tests.
    pub fn with_seed(entities: EntityStore, seed: u64) -> Self {
        Self {
            entities,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Response of a top-ranked Prompt matching `code`. Ties are broken
    /// uniformly at random on every call.
    pub async fn best_response(&self, code: &str) -> EngineResult<RankedResponse> {
        let candidates = self.candidates(code).await?;
        let chosen = {
            let mut rng = self.rng.lock().unwrap();
            select_best(&candidates, &mut *rng).cloned()
        };
        let chosen = chosen.ok_or_else(|| no_match(code))?;
        debug!(prompt_id = %chosen.id, rank = chosen.rank, candidates = candidates.len(), "selected best response");
        self.ranked_response(chosen).await
    }

    /// Response of any Prompt matching `code`, uniformly over all ranks.
    pub async fn random_response(&self, code: &str) -> EngineResult<RankedResponse> {
        let candidates = self.candidates(code).await?;
        let chosen = {
            let mut rng = self.rng.lock().unwrap();
            select_random(&candidates, &mut *rng).cloned()
        };
        let chosen = chosen.ok_or_else(|| no_match(code))?;
        debug!(prompt_id = %chosen.id, rank = chosen.rank, "selected random response");
        self.ranked_response(chosen).await
    }

    pub async fn response_by_id(&self, prompt: &ObjectId) -> EngineResult<PromptDetail> {
        let record = self.entities.fetch_prompt(prompt).await?;
        let response = self.entities.fetch_response(record.response_id()?).await?;
        Ok(PromptDetail {
            prompt_id: record.id,
            instruct: record.instruct,
            response: response.response,
            rank: record.rank,
            code: record.code,
            git_url: record.git_url,
        })
    }

    /// Prompt IDs matching `code`, highest rank first. Order among equal
    /// ranks is unspecified.
    pub async fn response_list(&self, code: &str) -> EngineResult<Vec<ObjectId>> {
        let query = TextQuery::like(kind::PROMPT, field::CODE, code).sorted_desc_by(field::RANK);
        let objects = self.entities.store().query_text(&query).await?;
        Ok(objects.into_iter().map(|o| o.id).collect())
    }

    /// Number of Prompts matching `code`.
    pub async fn prompt_count(&self, code: &str) -> EngineResult<usize> {
        let query = TextQuery::like(kind::PROMPT, field::CODE, code);
        Ok(self.entities.store().count_text(&query).await?)
    }

    /// Matching Prompts; every one must have a linked response.
    async fn candidates(&self, code: &str) -> EngineResult<Vec<PromptRecord>> {
        let query = TextQuery::like(kind::PROMPT, field::CODE, code).sorted_desc_by(field::RANK);
        let objects = self.entities.store().query_text(&query).await?;
        if objects.is_empty() {
            return Err(no_match(code));
        }

        let mut records = Vec::with_capacity(objects.len());
        for object in &objects {
            let record = PromptRecord::from_object(object)?;
            record.response_id()?;
            records.push(record);
        }
        Ok(records)
    }

    async fn ranked_response(&self, record: PromptRecord) -> EngineResult<RankedResponse> {
        let response = self.entities.fetch_response(record.response_id()?).await?;
        Ok(RankedResponse {
            prompt_id: record.id,
            instruct: record.instruct,
            response: response.response,
        })
    }
}

fn no_match(code: &str) -> EngineError {
    EngineError::NotFound(format!("no prompt matches code '{}'", code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ReferenceGraph;
    use crate::rank::{RankEngine, Vote};
    use crate::semantic::HashingEmbedder;
    use crate::storage::{OpenStore, SqliteStore};
    use std::collections::HashSet;
    use std::sync::Arc;

    struct Fixture {
        entities: EntityStore,
        graph: ReferenceGraph,
        ranks: RankEngine,
        retrieval: RankedRetrieval,
    }

    fn fixture() -> Fixture {
        let store = SqliteStore::open_in_memory(Arc::new(HashingEmbedder::default())).unwrap();
        let entities = EntityStore::new(Arc::new(store));
        Fixture {
            graph: ReferenceGraph::new(entities.clone()),
            ranks: RankEngine::new(entities.clone()),
            retrieval: RankedRetrieval::with_seed(entities.clone(), 11),
            entities,
        }
    }

    impl Fixture {
        async fn explained(&self, instruct: &str, code: &str, response: &str) -> ObjectId {
            let prompt = self.entities.create_prompt(instruct, code, None).await.unwrap();
            let resp = self.entities.create_response(response).await.unwrap();
            self.graph.link_prompt_to_response(&prompt, &resp).await.unwrap();
            prompt
        }
    }

    #[tokio::test]
    async fn best_response_prefers_highest_rank() {
        let f = fixture();
        let _low = f.explained("a", "print('x')", "meh").await;
        let high = f.explained("b", "print('x'); print('y')", "great").await;
        f.ranks.vote(&high, Vote::Up).await.unwrap();

        for _ in 0..20 {
            let best = f.retrieval.best_response("print").await.unwrap();
            assert_eq!(best.prompt_id, high);
            assert_eq!(best.instruct, "b");
            assert_eq!(best.response, "great");
        }
    }

    #[tokio::test]
    async fn best_response_visits_every_tied_prompt() {
        let f = fixture();
        let mut tied = HashSet::new();
        for i in 0..3 {
            tied.insert(f.explained("i", "fn main() {}", &format!("r{}", i)).await);
        }

        let mut seen = HashSet::new();
        for _ in 0..100 {
            seen.insert(f.retrieval.best_response("main").await.unwrap().prompt_id);
        }
        assert_eq!(seen, tied);
    }

    #[tokio::test]
    async fn random_response_is_a_member_of_the_match_set() {
        let f = fixture();
        let a = f.explained("i", "SELECT 1", "one").await;
        let b = f.explained("i", "SELECT 2", "two").await;
        f.ranks.vote(&a, Vote::Up).await.unwrap();
        let _other = f.explained("i", "DROP TABLE t", "nope").await;

        let mut seen = HashSet::new();
        for _ in 0..100 {
            seen.insert(f.retrieval.random_response("SELECT").await.unwrap().prompt_id);
        }
        assert_eq!(seen, HashSet::from([a, b]));
    }

    #[tokio::test]
    async fn unmatched_code_is_not_found() {
        let f = fixture();
        f.explained("i", "print('x')", "r").await;
        let err = f.retrieval.best_response("console.log").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        let err = f.retrieval.random_response("console.log").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn unlinked_prompt_is_a_missing_response() {
        let f = fixture();
        f.explained("i", "print('x')", "r").await;
        let orphan = f.entities.create_prompt("i", "print('y')", None).await.unwrap();

        let err = f.retrieval.best_response("print").await.unwrap_err();
        assert!(matches!(err, EngineError::MissingResponse(ref id) if *id == orphan));
    }

    #[tokio::test]
    async fn response_list_is_sorted_by_rank() {
        let f = fixture();
        let a = f.explained("i", "x = 1", "r").await;
        let b = f.explained("i", "x = 2", "r").await;
        let c = f.explained("i", "x = 3", "r").await;
        f.ranks.vote(&c, Vote::Up).await.unwrap();
        f.ranks.vote(&c, Vote::Up).await.unwrap();
        f.ranks.vote(&b, Vote::Up).await.unwrap();
        f.ranks.vote(&a, Vote::Down).await.unwrap();

        assert_eq!(f.retrieval.response_list("x =").await.unwrap(), vec![c, b, a]);
        assert!(f.retrieval.response_list("y =").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn response_by_id_returns_full_detail() {
        let f = fixture();
        let prompt = f
            .entities
            .create_prompt("Explain:", "print('x')", Some("https://git.example/r"))
            .await
            .unwrap();
        let resp = f.entities.create_response("prints x").await.unwrap();
        f.graph.link_prompt_to_response(&prompt, &resp).await.unwrap();

        let detail = f.retrieval.response_by_id(&prompt).await.unwrap();
        assert_eq!(
            detail,
            PromptDetail {
                prompt_id: prompt,
                instruct: "Explain:".into(),
                response: "prints x".into(),
                rank: 1,
                code: "print('x')".into(),
                git_url: Some("https://git.example/r".into()),
            }
        );
    }

    #[tokio::test]
    async fn prompt_count_counts_fuzzy_matches() {
        let f = fixture();
        f.explained("i", "print('a')", "r").await;
        f.explained("i", "print('b')", "r").await;
        f.explained("i", "echo c", "r").await;

        assert_eq!(f.retrieval.prompt_count("print").await.unwrap(), 2);
        assert_eq!(f.retrieval.prompt_count("nothing").await.unwrap(), 0);
    }
}
