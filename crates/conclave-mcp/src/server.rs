//! MCP server setup and lifecycle.
//!
//! Provides [`run_server`] which connects the gateway link, starts the
//! stdio-based MCP server, and blocks until the client disconnects.

use std::sync::Arc;

use rmcp::{model::*, tool_handler, transport::stdio, ServerHandler, ServiceExt};

use conclave_core::{ConclaveConfig, ConclaveError};
use conclave_gateway::GatewayLink;
use conclave_review::pipeline::ReviewPipeline;

use crate::tools::ConclaveServer;

const SERVER_INSTRUCTIONS: &str = "\
Conclave reviews code with a panel of three independent AI reviewers:\n\
- code_review: submit source code (plus optional context describing what it\n\
  should do) and receive a 2-of-3 majority verdict with each reviewer's\n\
  written rationale.\n\
A result with \"partial\": true means the deadline passed before every\n\
reviewer answered; the majority was computed over the verdicts received.";

#[tool_handler]
impl ServerHandler for ConclaveServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "conclave".to_string(),
                title: Some("Conclave Code Review".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: Some("Tri-agent AI code review with majority verdicts".to_string()),
                icons: None,
                website_url: None,
            },
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
        }
    }
}

/// Connect to the review gateway and serve the MCP tools on stdio.
///
/// This is called by the `conclave mcp` CLI subcommand. The gateway link is
/// established once here and shared by every tool call; the function blocks
/// until the MCP client closes stdin.
///
/// # Errors
///
/// Returns [`ConclaveError::Connection`] if the gateway cannot be reached,
/// or [`ConclaveError::Config`] if the server fails to initialize or
/// encounters a transport error.
///
/// # Examples
///
/// ```no_run
/// use conclave_core::ConclaveConfig;
///
/// # async fn example() -> Result<(), conclave_core::ConclaveError> {
/// conclave_mcp::server::run_server(ConclaveConfig::default()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_server(config: ConclaveConfig) -> Result<(), ConclaveError> {
    let link = Arc::new(GatewayLink::connect(&config.gateway).await?);
    let pipeline = Arc::new(ReviewPipeline::new(link, config.review.clone()));
    let server = ConclaveServer::new(pipeline);
    tracing::info!("gateway link established, serving MCP tools on stdio");

    let service = server
        .serve(stdio())
        .await
        .map_err(|e| ConclaveError::Config(format!("MCP server failed to start: {e}")))?;

    service
        .waiting()
        .await
        .map_err(|e| ConclaveError::Config(format!("MCP server error: {e}")))?;

    Ok(())
}
