//! Shared fixtures for the integration tests
//!
//! Every test gets its own in-memory store, the offline hashing embedder
//! and a scripted inference client, so nothing leaves the process.

#![allow(dead_code)]

use modernizer::annotation::AnnotationOutcome;
use modernizer::entity::{field, kind, EntityStore};
use modernizer::inference::MockInference;
use modernizer::instruct::InMemoryInstructStore;
use modernizer::{EngineConfig, HashingEmbedder, ModernizerApi, ObjectId, OpenStore, SqliteStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Config with millisecond retry delays.
pub fn fast_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.retry.base_delay = Duration::from_millis(1);
    config.retry.max_delay = Duration::from_millis(5);
    config
}

pub fn memory_store() -> Arc<SqliteStore> {
    Arc::new(
        SqliteStore::open_in_memory(Arc::new(HashingEmbedder::default()))
            .unwrap()
            .with_vectorized_field(kind::SEMANTIC_MEANING, field::SEMANTIC_MEANING),
    )
}

pub fn file_store(path: &Path) -> Arc<SqliteStore> {
    Arc::new(
        SqliteStore::open(path, Arc::new(HashingEmbedder::default()))
            .unwrap()
            .with_vectorized_field(kind::SEMANTIC_MEANING, field::SEMANTIC_MEANING),
    )
}

pub fn api_over(store: Arc<SqliteStore>, mock: Arc<MockInference>) -> ModernizerApi {
    ModernizerApi::new(
        store,
        mock,
        Arc::new(InMemoryInstructStore::with_defaults()),
        &fast_config(),
    )
}

pub fn api_with(mock: Arc<MockInference>) -> ModernizerApi {
    api_over(memory_store(), mock)
}

pub fn entities(store: &Arc<SqliteStore>) -> EntityStore {
    EntityStore::new(store.clone())
}

/// Wait for the annotation outcome of one prompt, skipping others.
pub async fn outcome_for(
    outcomes: &mut broadcast::Receiver<AnnotationOutcome>,
    prompt_id: &ObjectId,
) -> AnnotationOutcome {
    let wait = async {
        loop {
            let outcome = outcomes.recv().await.expect("outcome channel closed");
            if &outcome.prompt_id == prompt_id {
                return outcome;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("annotation did not finish")
}
