//! Semantic similarity: embedding backends and the meaning index

mod embedding;
mod index;

pub use embedding::{cosine_similarity, Embedder, EmbeddingError, HashingEmbedder, OllamaEmbedder};
#[cfg(feature = "embeddings")]
pub use embedding::FastEmbedEmbedder;
pub use index::{SemanticIndex, SimilarMatch, DEFAULT_CERTAINTY};
