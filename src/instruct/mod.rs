//! Instruction template store
//!
//! Named sets of instruction templates. A generation without a literal
//! instruction draws one at random from a set.

mod defaults;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use crate::error::{EngineError, EngineResult};

/// Set used when no set name is given.
pub const DEFAULT_SET: &str = "default";

fn set_name(name: &str) -> &str {
    let name = name.trim();
    if name.is_empty() {
        DEFAULT_SET
    } else {
        name
    }
}

/// Store of named instruction sets. An empty set name means `default`.
#[async_trait]
pub trait InstructStore: Send + Sync {
    /// A uniformly random member of the set.
    async fn random_member(&self, set: &str) -> EngineResult<String>;

    /// All members of the set, sorted.
    async fn members(&self, set: &str) -> EngineResult<Vec<String>>;

    /// Add an item; returns whether it was new.
    async fn add(&self, set: &str, item: &str) -> EngineResult<bool>;

    /// Remove an item; returns whether it was present.
    async fn remove(&self, set: &str, item: &str) -> EngineResult<bool>;

    /// Names of all non-empty sets, sorted.
    async fn sets(&self) -> EngineResult<Vec<String>>;
}

/// In-process instruction store.
pub struct InMemoryInstructStore {
    sets: Mutex<BTreeMap<String, BTreeSet<String>>>,
    rng: Mutex<StdRng>,
}

impl Default for InMemoryInstructStore {
    fn default() -> Self {
        Self::empty()
    }
}

impl InMemoryInstructStore {
    pub fn empty() -> Self {
        Self {
            sets: Mutex::new(BTreeMap::new()),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seeded with the canned instruction sets.
    pub fn with_defaults() -> Self {
        let store = Self::empty();
        {
            let mut sets = store.sets.lock().unwrap();
            for (name, items) in defaults::SETS {
                sets.insert(
                    name.to_string(),
                    items.iter().map(|s| s.to_string()).collect(),
                );
            }
        }
        store
    }

    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock().unwrap() = StdRng::seed_from_u64(seed);
        self
    }
}

#[async_trait]
impl InstructStore for InMemoryInstructStore {
    async fn random_member(&self, set: &str) -> EngineResult<String> {
        let name = set_name(set);
        let sets = self.sets.lock().unwrap();
        let items = sets
            .get(name)
            .filter(|items| !items.is_empty())
            .ok_or_else(|| EngineError::UnknownInstructSet(name.to_string()))?;
        let mut rng = self.rng.lock().unwrap();
        items
            .iter()
            .choose(&mut *rng)
            .cloned()
            .ok_or_else(|| EngineError::UnknownInstructSet(name.to_string()))
    }

    async fn members(&self, set: &str) -> EngineResult<Vec<String>> {
        let name = set_name(set);
        let sets = self.sets.lock().unwrap();
        sets.get(name)
            .map(|items| items.iter().cloned().collect())
            .ok_or_else(|| EngineError::UnknownInstructSet(name.to_string()))
    }

    async fn add(&self, set: &str, item: &str) -> EngineResult<bool> {
        let item = item.trim();
        if item.is_empty() {
            return Err(EngineError::InvalidInput("instruct item is empty".into()));
        }
        let mut sets = self.sets.lock().unwrap();
        Ok(sets
            .entry(set_name(set).to_string())
            .or_default()
            .insert(item.to_string()))
    }

    async fn remove(&self, set: &str, item: &str) -> EngineResult<bool> {
        let mut sets = self.sets.lock().unwrap();
        Ok(sets
            .get_mut(set_name(set))
            .map(|items| items.remove(item.trim()))
            .unwrap_or(false))
    }

    async fn sets(&self) -> EngineResult<Vec<String>> {
        let sets = self.sets.lock().unwrap();
        Ok(sets
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(name, _)| name.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn defaults_contain_every_canned_set() {
        let store = InMemoryInstructStore::with_defaults();
        let sets = store.sets().await.unwrap();
        for name in [
            "default",
            "developer",
            "security",
            "funny",
            "architecture",
            "project-management",
            "modernisation",
            "explanation",
            "test-engineering",
            "file-based",
            "miscellaneous",
        ] {
            assert!(sets.contains(&name.to_string()), "missing set {}", name);
        }
    }

    #[tokio::test]
    async fn random_member_comes_from_the_set() {
        let store = InMemoryInstructStore::with_defaults().with_seed(5);
        let members = store.members("security").await.unwrap();
        for _ in 0..20 {
            let item = store.random_member("security").await.unwrap();
            assert!(members.contains(&item));
        }
    }

    #[tokio::test]
    async fn empty_name_means_default() {
        let store = InMemoryInstructStore::with_defaults();
        let item = store.random_member("").await.unwrap();
        assert!(store.members(DEFAULT_SET).await.unwrap().contains(&item));
    }

    #[tokio::test]
    async fn unknown_set_is_a_client_error() {
        let store = InMemoryInstructStore::with_defaults();
        let err = store.random_member("poetry").await.unwrap_err();
        assert!(matches!(err, EngineError::UnknownInstructSet(ref name) if name == "poetry"));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn add_and_remove_items() {
        let store = InMemoryInstructStore::empty();
        assert!(store.add("", "Summarize:").await.unwrap());
        assert!(!store.add("default", "Summarize:").await.unwrap());
        assert_eq!(store.random_member("default").await.unwrap(), "Summarize:");

        assert!(store.remove("", "Summarize:").await.unwrap());
        assert!(!store.remove("", "Summarize:").await.unwrap());

        // Emptied sets behave like unknown ones
        assert!(store.random_member("default").await.is_err());
        assert!(store.sets().await.unwrap().is_empty());
    }
}
