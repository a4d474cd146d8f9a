//! Tool implementations for the Conclave MCP server.
//!
//! One tool is exposed: `code_review`. It delegates to the review pipeline
//! and returns the aggregated verdict as JSON via `CallToolResult`.

use std::collections::BTreeMap;
use std::sync::Arc;

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars, tool, tool_router, ErrorData as McpError,
};
use serde::{Deserialize, Serialize};

use conclave_core::ReviewVerdict;
use conclave_review::pipeline::ReviewPipeline;
use conclave_review::prompt;

/// MCP server exposing the Conclave review tool.
///
/// Holds the shared pipeline; every tool call submits through the same
/// gateway link.
#[derive(Clone)]
pub struct ConclaveServer {
    pub(crate) pipeline: Arc<ReviewPipeline>,
    pub(crate) tool_router: ToolRouter<Self>,
}

// --- Parameter structs ---

/// Parameters for the `code_review` tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CodeReviewParams {
    /// Source code to review, passed through verbatim.
    pub code: String,
    /// What the code is supposed to do; shown to the reviewers.
    pub context: Option<String>,
}

// --- Response structs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CodeReviewResponse {
    request_id: String,
    final_decision: String,
    passed: bool,
    partial: bool,
    reviews: Vec<String>,
    agents: BTreeMap<String, AgentReview>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AgentReview {
    decision: String,
    narrative: String,
}

impl CodeReviewResponse {
    fn from_verdict(verdict: &ReviewVerdict) -> Self {
        let reviews = verdict
            .verdicts
            .iter()
            .map(|v| format!("Reviewer {}: {}", v.agent, v.narrative))
            .collect();
        let agents = verdict
            .per_agent()
            .into_iter()
            .map(|(name, v)| {
                (
                    name.to_string(),
                    AgentReview {
                        decision: v.decision.to_string(),
                        narrative: v.narrative.clone(),
                    },
                )
            })
            .collect();
        Self {
            request_id: verdict.request_id.clone(),
            final_decision: verdict.final_decision.to_string(),
            passed: verdict.passed,
            partial: verdict.partial,
            reviews,
            agents,
        }
    }
}

fn mcp_err(msg: impl Into<String>) -> McpError {
    McpError::internal_error(msg.into(), None)
}

#[tool_router]
impl ConclaveServer {
    /// Create a new server around a connected review pipeline.
    pub fn new(pipeline: Arc<ReviewPipeline>) -> Self {
        Self {
            pipeline,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        name = "code_review",
        description = "Submit source code for review by a panel of three independent AI reviewers. Each reviewer returns a POSITIVE or NEGATIVE verdict with a written rationale; the final decision is a 2-of-3 majority. Use this to validate generated or modified code before shipping it."
    )]
    pub async fn code_review(
        &self,
        Parameters(params): Parameters<CodeReviewParams>,
    ) -> Result<CallToolResult, McpError> {
        if params.code.trim().is_empty() {
            return Err(mcp_err("No code provided. Pass the source to review in `code`."));
        }

        let context = params.context.as_deref().unwrap_or(prompt::DEFAULT_CONTEXT);
        let verdict = self
            .pipeline
            .submit(&params.code, context)
            .await
            .map_err(|e| mcp_err(format!("Review failed: {e}")))?;

        let response = CodeReviewResponse::from_verdict(&verdict);
        let json = serde_json::to_string_pretty(&response).map_err(|e| mcp_err(e.to_string()))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}
