//! MCP server for conceptrag
//!
//! Exposes the tool contracts over stdio JSON-RPC for AI assistant
//! integration.

mod protocol;
mod server;
mod tools;

pub use protocol::{Content, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolDefinition, ToolResult};
pub use server::{start_server, McpServer};
pub use tools::handle_tool_call;
