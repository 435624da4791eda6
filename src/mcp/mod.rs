//! MCP server for the modernizer: exposes generation, voting and
//! retrieval via the Model Context Protocol.

pub mod params;

use params::*;
use crate::api::{GenerateParams, ModernizerApi};
use crate::error::EngineResult;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Serialize;
use tracing::{error, info};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ok_text(text: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn err_text(msg: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg)]))
}

/// Pretty JSON of a successful result, or the error as tool error text.
fn json_result<T: Serialize>(result: EngineResult<T>) -> Result<CallToolResult, McpError> {
    match result {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => ok_text(text),
            Err(e) => err_text(format!("failed to encode result: {}", e)),
        },
        Err(e) => err_text(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// ModernizerMcpServer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ModernizerMcpServer {
    api: ModernizerApi,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ModernizerMcpServer {
    pub fn new(api: ModernizerApi) -> Self {
        Self {
            api,
            tool_router: Self::tool_router(),
        }
    }

    // ── Generation ──────────────────────────────────────────────────────

    #[tool(description = "Explain a code fragment; stores the prompt and response and queues its semantic annotation")]
    async fn generate(
        &self,
        Parameters(p): Parameters<GenerateToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = GenerateParams {
            code: p.code,
            instruct_type: p.instruct_type,
            instruct: p.instruct,
            git_url: p.git_url,
            model: p.model,
        };
        json_result(self.api.generate(params).await)
    }

    #[tool(description = "Upvote or downvote a prompt; returns the new rank")]
    async fn vote(&self, Parameters(p): Parameters<VoteParams>) -> Result<CallToolResult, McpError> {
        json_result(
            self.api
                .vote(&p.prompt_id, p.upvote)
                .await
                .map(|rank| serde_json::json!({ "prompt_id": p.prompt_id, "rank": rank })),
        )
    }

    // ── Retrieval ───────────────────────────────────────────────────────

    #[tool(description = "Response of a top-ranked prompt for matching code; ties are broken at random")]
    async fn best_response(&self, Parameters(p): Parameters<CodeParams>) -> Result<CallToolResult, McpError> {
        json_result(self.api.best_response(&p.code).await)
    }

    #[tool(description = "Response of any prompt for matching code, regardless of rank")]
    async fn random_response(&self, Parameters(p): Parameters<CodeParams>) -> Result<CallToolResult, McpError> {
        json_result(self.api.random_response(&p.code).await)
    }

    #[tool(description = "Instruction, response, rank, code and source URL of one prompt")]
    async fn response_by_id(&self, Parameters(p): Parameters<PromptIdParams>) -> Result<CallToolResult, McpError> {
        json_result(self.api.response_by_id(&p.prompt_id).await)
    }

    #[tool(description = "Prompt IDs for matching code, highest rank first")]
    async fn response_list(&self, Parameters(p): Parameters<CodeParams>) -> Result<CallToolResult, McpError> {
        json_result(self.api.response_list(&p.code).await)
    }

    #[tool(description = "Number of prompts for matching code")]
    async fn prompt_count(&self, Parameters(p): Parameters<CodeParams>) -> Result<CallToolResult, McpError> {
        json_result(self.api.prompt_count(&p.code).await)
    }

    #[tool(description = "Source URLs of code whose semantic meaning is similar to the query")]
    async fn similar_by_meaning(&self, Parameters(p): Parameters<SimilarParams>) -> Result<CallToolResult, McpError> {
        if p.detailed.unwrap_or(false) {
            json_result(self.api.similar_matches(&p.query, p.certainty).await)
        } else {
            json_result(self.api.similar_by_meaning(&p.query, p.certainty).await)
        }
    }

    #[tool(description = "Stored semantic meaning for exactly this code, if any")]
    async fn has_semantic_meaning(&self, Parameters(p): Parameters<ExactCodeParams>) -> Result<CallToolResult, McpError> {
        json_result(
            self.api
                .has_semantic_meaning(&p.code)
                .await
                .map(|text| serde_json::json!({ "found": text.is_some(), "semantic_meaning": text })),
        )
    }

    // ── Instructions ────────────────────────────────────────────────────

    #[tool(description = "List instruction sets, or the members of one set")]
    async fn list_instructs(&self, Parameters(p): Parameters<InstructSetParams>) -> Result<CallToolResult, McpError> {
        match p.set {
            Some(set) => json_result(self.api.instruct_members(&set).await),
            None => json_result(self.api.instruct_sets().await),
        }
    }

    #[tool(description = "Add an instruction to a set")]
    async fn add_instruct(&self, Parameters(p): Parameters<InstructItemParams>) -> Result<CallToolResult, McpError> {
        let set = p.set.unwrap_or_default();
        json_result(self.api.add_instruct(&set, &p.item).await)
    }

    #[tool(description = "Remove an instruction from a set")]
    async fn remove_instruct(&self, Parameters(p): Parameters<InstructItemParams>) -> Result<CallToolResult, McpError> {
        let set = p.set.unwrap_or_default();
        json_result(self.api.remove_instruct(&set, &p.item).await)
    }

    // ── Maintenance ─────────────────────────────────────────────────────

    #[tool(description = "Repair unfinished response and meaning links and re-queue failed annotations")]
    async fn reconcile(&self) -> Result<CallToolResult, McpError> {
        let report = self.api.reconcile().await;
        json_result(self.api.retry_annotations().map(|requeued| {
            serde_json::json!({
                "repaired": report.repaired,
                "discarded": report.discarded,
                "still_pending": report.still_pending,
                "annotations_requeued": requeued,
                "annotations_pending": self.api.pending_annotations(),
            })
        }))
    }
}

#[tool_handler]
impl ServerHandler for ModernizerMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Code explanation knowledge base: generate, vote on and retrieve explanations of code fragments"
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Serve the API over stdio until the client disconnects. Returns the
/// process exit code.
pub async fn serve_stdio(api: ModernizerApi) -> i32 {
    let server = ModernizerMcpServer::new(api.clone());
    info!("modernizer mcp server starting on stdio");

    let service = match server.serve(rmcp::transport::stdio()).await {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to start MCP server");
            return 1;
        }
    };

    let code = match service.waiting().await {
        Ok(_) => 0,
        Err(e) => {
            error!(error = %e, "MCP server error");
            1
        }
    };
    api.shutdown().await;
    code
}
