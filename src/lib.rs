//! `mcp_boilerplate`: expose callable tools over MCP (JSON-RPC 2.0 over HTTP).
//!
//! Tools are declared in JSON with an input schema, paired with async
//! handlers, and served through a single [`Dispatcher`]: arguments are
//! validated against the schema, the handler runs, and the outcome comes
//! back either as a [`ToolResult`] or as a protocol-level [`RpcError`].
//!
//! # Quick start
//!
//! ```rust
//! use mcp_boilerplate::{Server, FnToolHandler, text_result, JsonRpcRequest};
//! use serde_json::Value;
//!
//! # async fn example() -> Result<(), mcp_boilerplate::McpError> {
//! let mut builder = Server::builder()
//!     .tools_json(r#"[{"name":"echo","description":"echoes","inputSchema":{"type":"object","properties":{"message":{"type":"string"}},"required":["message"]}}]"#.as_bytes())
//!     .server_info("my-server", "0.1.0");
//!
//! builder.handle_tool("echo", FnToolHandler::new(|args: Value| async move {
//!     let msg = args.get("message").and_then(|v| v.as_str()).unwrap_or("");
//!     Ok(text_result(msg))
//! }));
//! let server = builder.build()?;
//!
//! let req: JsonRpcRequest = serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)?;
//! let resp = server.handle(req).await;
//! let json = serde_json::to_string(&resp)?;
//! # let _ = json;
//! # Ok(())
//! # }
//! ```
//!
//! To serve over HTTP, hand the server to [`http_router`] and run the
//! router with `axum::serve`.

pub mod dispatch;
pub mod loader;
pub mod registry;
pub mod server;
pub mod transport_http;
pub mod types;
mod validate;

// Re-export the most commonly used items at the crate root.
pub use dispatch::Dispatcher;
pub use loader::{load_tools, parse_tool, parse_tools};
pub use registry::{FnToolHandler, RegisteredTool, ToolHandler, ToolRegistry, TypedToolHandler};
pub use server::{Server, ServerBuilder};
pub use transport_http::http_router;
pub use types::{
    error_result, structured_result, text_result, ContentBlock, ErrorKind, FieldKind,
    FieldSchema, JsonRpcRequest, JsonRpcResponse, McpError, McpResponse, RpcError, SchemaMeta,
    Tool, ToolResult, PROTOCOL_VERSION,
};
