//! MCP server exposing Conclave code review as a tool.
//!
//! One tool is served: `code_review`, which submits source code to the
//! remote reviewer panel and returns the aggregated verdict. The gateway
//! link is established once at startup and shared by every tool call.

pub mod server;
pub mod tools;
