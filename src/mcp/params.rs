//! MCP tool parameter structs with schemars-derived JSON schemas.

use schemars::JsonSchema;
use serde::Deserialize;

// ── Generation params ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateToolParams {
    #[schemars(description = "The code fragment to explain")]
    pub code: String,
    #[schemars(description = "Instruction set to draw a random instruction from (default: 'default')")]
    pub instruct_type: Option<String>,
    #[schemars(description = "Literal instruction; overrides instruct_type")]
    pub instruct: Option<String>,
    #[schemars(description = "URL of the repository the code comes from")]
    pub git_url: Option<String>,
    #[schemars(description = "Model to use instead of the configured one")]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct VoteParams {
    #[schemars(description = "The prompt ID")]
    pub prompt_id: String,
    #[schemars(description = "true to upvote, false to downvote")]
    pub upvote: bool,
}

// ── Retrieval params ────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CodeParams {
    #[schemars(description = "Code fragment; matched as a substring, '*' and '?' are wildcards")]
    pub code: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExactCodeParams {
    #[schemars(description = "Code fragment; matched exactly")]
    pub code: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PromptIdParams {
    #[schemars(description = "The prompt ID")]
    pub prompt_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SimilarParams {
    #[schemars(description = "Code or a description of what the code does")]
    pub query: String,
    #[schemars(description = "Minimum certainty between 0 and 1 (default 0.8)")]
    pub certainty: Option<f32>,
    #[schemars(description = "Return prompt IDs and certainties alongside the URLs")]
    pub detailed: Option<bool>,
}

// ── Instruction params ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct InstructSetParams {
    #[schemars(description = "Instruction set name (default: 'default')")]
    pub set: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct InstructItemParams {
    #[schemars(description = "Instruction set name (default: 'default')")]
    pub set: Option<String>,
    #[schemars(description = "The instruction text")]
    pub item: String,
}
