//! Backing object store
//!
//! Entities live in an object store reached through the `ObjectStore`
//! trait. The bundled implementation is `SqliteStore`.

mod sqlite;
#[cfg(test)]
pub(crate) mod testing;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{
    ObjectId, ObjectStore, OpenStore, Properties, ScoredObject, SimilarityQuery, StorageError,
    StorageResult, StoredObject, TextMatch, TextQuery,
};
