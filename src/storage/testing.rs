//! Fault-injecting store wrapper for unit tests

use super::traits::{
    ObjectId, ObjectStore, Properties, ScoredObject, SimilarityQuery, StorageError, StorageResult,
    StoredObject, TextQuery,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Delegates to an inner store but fails the next `n` reference writes
/// for one reference name, and optionally the next `m` object creations.
/// Creations can also be slowed down; the object lands after the delay.
pub struct FlakyStore {
    inner: Arc<dyn ObjectStore>,
    failing_reference: String,
    reference_failures: AtomicUsize,
    create_failures: AtomicUsize,
    create_delay: Option<Duration>,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self {
            inner,
            failing_reference: String::new(),
            reference_failures: AtomicUsize::new(0),
            create_failures: AtomicUsize::new(0),
            create_delay: None,
        }
    }

    pub fn fail_reference(mut self, name: &str, times: usize) -> Self {
        self.failing_reference = name.to_string();
        self.reference_failures = AtomicUsize::new(times);
        self
    }

    pub fn fail_creates(self, times: usize) -> Self {
        self.create_failures.store(times, Ordering::SeqCst);
        self
    }

    pub fn delay_creates(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn check_reference(&self, name: &str) -> StorageResult<()> {
        if name == self.failing_reference && Self::take(&self.reference_failures) {
            return Err(StorageError::Unavailable(format!("injected failure writing {}", name)));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for FlakyStore {
    async fn create_object(&self, kind: &str, properties: Properties) -> StorageResult<ObjectId> {
        if Self::take(&self.create_failures) {
            return Err(StorageError::Unavailable(format!("injected failure creating {}", kind)));
        }
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.create_object(kind, properties).await
    }

    async fn fetch_object(&self, id: &ObjectId) -> StorageResult<Option<StoredObject>> {
        self.inner.fetch_object(id).await
    }

    async fn merge_properties(&self, id: &ObjectId, properties: Properties) -> StorageResult<()> {
        self.inner.merge_properties(id, properties).await
    }

    async fn merge_properties_if_version(
        &self,
        id: &ObjectId,
        expected_version: u64,
        properties: Properties,
    ) -> StorageResult<bool> {
        self.inner
            .merge_properties_if_version(id, expected_version, properties)
            .await
    }

    async fn delete_object(&self, id: &ObjectId) -> StorageResult<bool> {
        self.inner.delete_object(id).await
    }

    async fn query_text(&self, query: &TextQuery) -> StorageResult<Vec<StoredObject>> {
        self.inner.query_text(query).await
    }

    async fn count_text(&self, query: &TextQuery) -> StorageResult<usize> {
        self.inner.count_text(query).await
    }

    async fn query_similar(&self, query: &SimilarityQuery) -> StorageResult<Vec<ScoredObject>> {
        self.inner.query_similar(query).await
    }

    async fn set_reference(&self, source: &ObjectId, name: &str, target: &ObjectId) -> StorageResult<()> {
        self.check_reference(name)?;
        self.inner.set_reference(source, name, target).await
    }

    async fn add_reference(&self, source: &ObjectId, name: &str, target: &ObjectId) -> StorageResult<()> {
        self.check_reference(name)?;
        self.inner.add_reference(source, name, target).await
    }

    async fn references(&self, source: &ObjectId, name: &str) -> StorageResult<Vec<ObjectId>> {
        self.inner.references(source, name).await
    }
}
