//! Object store trait definitions

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::semantic::Embedder;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Opaque identifier assigned by the store when an object is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Untyped property map as held by the store. Typed decoding happens in
/// the entity layer.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// An object as returned by the store, including its outgoing references.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub id: ObjectId,
    /// Object class (e.g. "Prompt")
    pub kind: String,
    pub properties: Properties,
    /// Outgoing named references: reference name → targets in insertion order
    pub references: HashMap<String, Vec<ObjectId>>,
    /// Incremented on every property write; the compare-and-swap token
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl StoredObject {
    /// Targets of a named reference (empty if the reference was never set).
    pub fn reference(&self, name: &str) -> &[ObjectId] {
        self.references.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// How a text query matches the field value.
#[derive(Debug, Clone, PartialEq)]
pub enum TextMatch {
    /// Substring match. `*` matches any run of characters, `?` any single
    /// character; the pattern may occur anywhere in the field.
    Like(String),
    /// Exact equality.
    Equal(String),
}

/// Filtered text query over one field of one object kind.
#[derive(Debug, Clone)]
pub struct TextQuery {
    pub kind: String,
    pub field: String,
    pub matcher: TextMatch,
    /// Integer field to sort by, descending
    pub sort_desc_by: Option<String>,
    pub limit: Option<usize>,
}

impl TextQuery {
    pub fn like(kind: impl Into<String>, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            field: field.into(),
            matcher: TextMatch::Like(pattern.into()),
            sort_desc_by: None,
            limit: None,
        }
    }

    pub fn equal(kind: impl Into<String>, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            field: field.into(),
            matcher: TextMatch::Equal(value.into()),
            sort_desc_by: None,
            limit: None,
        }
    }

    pub fn sorted_desc_by(mut self, field: impl Into<String>) -> Self {
        self.sort_desc_by = Some(field.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Nearest-neighbour query over a vectorized text field.
#[derive(Debug, Clone)]
pub struct SimilarityQuery {
    pub kind: String,
    pub field: String,
    /// Free text describing the concept to search for
    pub concept: String,
    /// Minimum certainty in [0, 1]
    pub min_certainty: f32,
    pub limit: Option<usize>,
}

impl SimilarityQuery {
    pub fn new(
        kind: impl Into<String>,
        field: impl Into<String>,
        concept: impl Into<String>,
        min_certainty: f32,
    ) -> Self {
        Self {
            kind: kind.into(),
            field: field.into(),
            concept: concept.into(),
            min_certainty,
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A similarity match and its certainty.
#[derive(Debug, Clone)]
pub struct ScoredObject {
    pub object: StoredObject,
    pub certainty: f32,
}

/// Trait for backing object stores
///
/// Mirrors what a vector database with graph-style references offers.
/// Every call is a single independent write or read; nothing spans calls.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    // === Objects ===

    /// Create an object of the given kind and return its new ID
    async fn create_object(&self, kind: &str, properties: Properties) -> StorageResult<ObjectId>;

    /// Fetch an object by ID
    async fn fetch_object(&self, id: &ObjectId) -> StorageResult<Option<StoredObject>>;

    /// Merge properties into an object unconditionally
    async fn merge_properties(&self, id: &ObjectId, properties: Properties) -> StorageResult<()>;

    /// Merge properties only if the object's version still equals
    /// `expected_version`. Returns `false` when the version moved on.
    async fn merge_properties_if_version(
        &self,
        id: &ObjectId,
        expected_version: u64,
        properties: Properties,
    ) -> StorageResult<bool>;

    /// Delete an object with its vectors and every reference to or from
    /// it. Returns `false` when it did not exist.
    async fn delete_object(&self, id: &ObjectId) -> StorageResult<bool>;

    // === Queries ===

    /// Find objects whose text field matches
    async fn query_text(&self, query: &TextQuery) -> StorageResult<Vec<StoredObject>>;

    /// Count objects whose text field matches
    async fn count_text(&self, query: &TextQuery) -> StorageResult<usize>;

    /// Find objects whose vectorized field is similar to the concept
    async fn query_similar(&self, query: &SimilarityQuery) -> StorageResult<Vec<ScoredObject>>;

    // === References ===

    /// Replace all targets of a named reference with a single target
    async fn set_reference(&self, source: &ObjectId, name: &str, target: &ObjectId) -> StorageResult<()>;

    /// Append a target to a named reference
    async fn add_reference(&self, source: &ObjectId, name: &str, target: &ObjectId) -> StorageResult<()>;

    /// Targets of a named reference
    async fn references(&self, source: &ObjectId, name: &str) -> StorageResult<Vec<ObjectId>>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: ObjectStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory(embedder: Arc<dyn Embedder>) -> StorageResult<Self>;
}
