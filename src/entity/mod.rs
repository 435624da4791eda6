//! Entity store adapter: typed Prompt, Response and SemanticMeaning records
//! on top of the untyped object store.

mod decode;
mod store;
mod types;

pub use store::EntityStore;
pub use types::{PromptRecord, ResponseRecord, SemanticMeaningRecord};

/// Object kinds
pub mod kind {
    pub const PROMPT: &str = "Prompt";
    pub const RESPONSE: &str = "Response";
    pub const SEMANTIC_MEANING: &str = "SemanticMeaning";
}

/// Property names
pub mod field {
    pub const INSTRUCT: &str = "instruct";
    pub const CODE: &str = "code";
    pub const RANK: &str = "rank";
    pub const GIT_URL: &str = "gitURL";
    pub const RESPONSE: &str = "response";
    pub const SEMANTIC_MEANING: &str = "semanticMeaning";
}

/// Reference names
pub mod reference {
    pub const HAS_RESPONSE: &str = "hasResponse";
    pub const HAS_SEMANTIC_MEANING: &str = "hasSemanticMeaning";
    pub const HAS_PROMPT: &str = "hasPrompt";
}

/// Rank assigned to every new Prompt
pub const INITIAL_RANK: i64 = 1;
