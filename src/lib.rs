//! Modernizer: ranked knowledge base of LLM code explanations
//!
//! Code fragments are sent to a language model together with an
//! instruction. Every exchange is stored as a Prompt linked to its
//! Response; users vote on Prompts, and retrieval prefers the best-ranked
//! one. In the background each Prompt is annotated with a short semantic
//! meaning, which makes code searchable by what it does.
//!
//! # Core Concepts
//!
//! - **Prompt**: instruction, code, rank and optional source URL
//! - **Response**: the model's explanation, linked 1:1 from its Prompt
//! - **SemanticMeaning**: a summary of the code, linked both ways with its Prompt
//! - **Rank**: starts at 1, changed only by compare-and-swap votes
//!
//! # Example
//!
//! ```no_run
//! use modernizer::{EngineConfig, GenerateParams, HashingEmbedder, ModernizerApi};
//! use std::sync::Arc;
//!
//! # async fn demo() -> modernizer::EngineResult<()> {
//! let api = ModernizerApi::from_config(&EngineConfig::default(), Arc::new(HashingEmbedder::default()))?;
//! let generated = api.generate(GenerateParams::new("print('x')")).await?;
//! api.vote(generated.prompt_id.as_str(), true).await?;
//! # Ok(())
//! # }
//! ```

pub mod annotation;
pub mod api;
pub mod config;
pub mod entity;
mod error;
pub mod graph;
pub mod inference;
pub mod instruct;
pub mod mcp;
pub mod query;
pub mod rank;
pub mod retry;
pub mod semantic;
pub mod storage;

pub use api::{GenerateParams, Generated, ModernizerApi};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use query::{PromptDetail, RankedResponse};
pub use rank::Vote;
pub use semantic::{Embedder, HashingEmbedder, OllamaEmbedder, SimilarMatch};
#[cfg(feature = "embeddings")]
pub use semantic::FastEmbedEmbedder;
pub use storage::{ObjectId, ObjectStore, OpenStore, SqliteStore, StorageError, StorageResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
