use std::collections::HashMap;
use std::sync::Arc;

use serde_json::value::RawValue;
use serde_json::{json, Value};

use crate::dispatch::{Dispatcher, INTERNAL_ERROR_MESSAGE};
use crate::loader;
use crate::registry::{ToolHandler, ToolRegistry};
use crate::types::*;

/// The MCP server. Create with `ServerBuilder`, then serve.
///
/// Holds no mutable state: every request is answered from the immutable
/// registry built at startup.
pub struct Server {
    pub(crate) server_name: String,
    pub(crate) server_version: String,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) tools_list: Arc<RawValue>,
}

impl Server {
    /// Create a new server builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Create a server over an already populated registry.
    pub fn from_registry(
        name: impl Into<String>,
        version: impl Into<String>,
        registry: ToolRegistry,
    ) -> Result<Server, McpError> {
        let tools: Vec<&Tool> = registry.tools().collect();
        let tools_list: Arc<RawValue> =
            serde_json::value::to_raw_value(&json!({ "tools": tools }))?.into();

        Ok(Server {
            server_name: name.into(),
            server_version: version.into(),
            dispatcher: Dispatcher::new(Arc::new(registry)),
            tools_list,
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Route a JSON-RPC request to the appropriate MCP handler.
    pub async fn handle(&self, req: JsonRpcRequest) -> McpResponse {
        if req.jsonrpc != "2.0" {
            return McpResponse::error(
                req.id,
                RpcError::new(ErrorKind::InvalidRequest, "jsonrpc must be '2.0'"),
            );
        }

        if matches!(req.id, Some(Value::Null)) {
            return McpResponse::error(
                None,
                RpcError::new(ErrorKind::InvalidRequest, "id must not be null"),
            );
        }

        // Anything without an id is a notification and gets no reply.
        if req.id.is_none() {
            tracing::debug!(method = %req.method, "notification");
            return McpResponse::notification();
        }

        match req.method.as_str() {
            "initialize" => self.handle_initialize(req),
            "ping" => McpResponse::ok(req.id, json!({})),
            "tools/list" => McpResponse::cached(req.id, &self.tools_list),
            "tools/call" => self.handle_tools_call(req).await,
            _ => McpResponse::error(
                req.id,
                RpcError::new(
                    ErrorKind::MethodNotFound,
                    format!("Method not found: {}", req.method),
                ),
            ),
        }
    }

    fn handle_initialize(&self, req: JsonRpcRequest) -> McpResponse {
        let params = req
            .params
            .as_ref()
            .and_then(|p| serde_json::from_value::<InitializeParams>(p.clone()).ok());

        let requested = params.as_ref().and_then(|p| p.protocol_version.as_deref());
        if let Some(p) = &params {
            let client_name = p.client_info.as_ref().map_or("", |c| c.name.as_str());
            let client_version = p.client_info.as_ref().map_or("", |c| c.version.as_str());
            tracing::info!(
                client_name,
                client_version,
                protocol_version = ?requested,
                "initialize"
            );
        }

        let result = json!({
            "protocolVersion": negotiate_protocol_version(requested),
            "capabilities": {
                "tools": {"listChanged": false},
            },
            "serverInfo": {
                "name": self.server_name,
                "version": self.server_version,
            },
        });

        McpResponse::ok(req.id, result)
    }

    async fn handle_tools_call(&self, req: JsonRpcRequest) -> McpResponse {
        let params: ToolCallParams = match req.params {
            Some(p) => match serde_json::from_value(p) {
                Ok(p) => p,
                Err(e) => {
                    return McpResponse::error(
                        req.id,
                        RpcError::new(ErrorKind::InvalidParams, format!("invalid params: {}", e)),
                    )
                }
            },
            None => {
                return McpResponse::error(
                    req.id,
                    RpcError::new(ErrorKind::InvalidParams, "params required"),
                );
            }
        };

        match self.dispatcher.invoke(&params.name, params.arguments).await {
            Ok(result) => match serde_json::to_value(&result) {
                Ok(value) => McpResponse::ok(req.id, value),
                Err(e) => {
                    tracing::error!(tool = %params.name, error = %e, "serialize tool result");
                    McpResponse::error(
                        req.id,
                        RpcError::new(ErrorKind::InternalError, INTERNAL_ERROR_MESSAGE),
                    )
                }
            },
            Err(err) => McpResponse::error(req.id, err),
        }
    }
}

/// Pick the protocol version to answer `initialize` with: the client's
/// version when we speak it, our latest otherwise.
pub fn negotiate_protocol_version(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|v| SUPPORTED_PROTOCOL_VERSIONS.iter().find(|s| **s == v).copied())
        .unwrap_or(PROTOCOL_VERSION)
}

/// Builder for constructing an MCP Server.
///
/// Definitions and handlers are registered separately and paired by name in
/// [`build()`](ServerBuilder::build), which fails if either side is missing.
#[derive(Default)]
pub struct ServerBuilder {
    tools: Vec<Tool>,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    load_error: Option<McpError>,
    server_name: Option<String>,
    server_version: Option<String>,
}

impl ServerBuilder {
    /// Load tool definitions from a JSON file.
    pub fn tools_file(mut self, path: impl AsRef<std::path::Path>) -> Self {
        match loader::load_tools(path) {
            Ok(tools) => self.tools.extend(tools),
            Err(e) => self.record_error(e),
        }
        self
    }

    /// Add tool definitions directly.
    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Parse tool definitions from raw JSON bytes.
    pub fn tools_json(mut self, data: &[u8]) -> Self {
        match loader::parse_tools(data) {
            Ok(tools) => self.tools.extend(tools),
            Err(e) => self.record_error(e),
        }
        self
    }

    /// Set server name and version.
    pub fn server_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self.server_version = Some(version.into());
        self
    }

    /// Register the handler for a defined tool.
    pub fn handle_tool(&mut self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            self.record_error(McpError::DuplicateTool(name));
        }
    }

    fn record_error(&mut self, e: McpError) {
        tracing::error!(error = %e, "server builder");
        if self.load_error.is_none() {
            self.load_error = Some(e);
        }
    }

    /// Build the server.
    pub fn build(mut self) -> Result<Server, McpError> {
        if let Some(e) = self.load_error.take() {
            return Err(e);
        }

        let mut registry = ToolRegistry::new();
        for tool in self.tools {
            let handler = self
                .handlers
                .get(&tool.name)
                .cloned()
                .ok_or_else(|| McpError::MissingHandler(tool.name.clone()))?;
            registry.register(tool, handler)?;
        }
        if let Some(name) = self.handlers.keys().find(|n| registry.lookup(n).is_none()) {
            return Err(McpError::UnknownHandler(name.clone()));
        }

        tracing::info!(tools = registry.len(), "tool registry built");
        Server::from_registry(
            self.server_name.unwrap_or_else(|| "mcp-boilerplate".into()),
            self.server_version.unwrap_or_else(|| "1.0.0".into()),
            registry,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FnToolHandler;
    use async_trait::async_trait;

    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        async fn call(&self, args: Value) -> Result<ToolResult, McpError> {
            let msg = args.get("msg").and_then(|v| v.as_str()).unwrap_or("no msg");
            Ok(text_result(format!("echo: {}", msg)))
        }
    }

    const ECHO_JSON: &str = r#"[
        {"name":"echo","title":"Echo","description":"echoes","inputSchema":{"type":"object","properties":{"msg":{"type":"string"}},"required":["msg"]}}
    ]"#;

    fn test_server() -> Server {
        let mut builder = Server::builder()
            .tools_json(ECHO_JSON.as_bytes())
            .server_info("test-server", "0.1.0");
        builder.handle_tool("echo", Arc::new(EchoHandler));
        builder.build().unwrap()
    }

    fn make_req(method: &str, id: Option<Value>, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id,
            method: method.into(),
            params,
        }
    }

    async fn call(srv: &Server, method: &str, params: Option<Value>) -> JsonRpcResponse {
        srv.handle(make_req(method, Some(json!(1)), params))
            .await
            .into_json_rpc()
    }

    #[tokio::test]
    async fn test_bad_jsonrpc_version() {
        let srv = test_server();
        let req = JsonRpcRequest {
            jsonrpc: "1.0".into(),
            id: Some(json!(1)),
            method: "ping".into(),
            params: None,
        };
        let resp = srv.handle(req).await.into_json_rpc();
        assert_eq!(resp.error.unwrap().code, ERR_CODE_INVALID_REQ);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let srv = test_server();
        let resp = call(&srv, "unknown/method", None).await;
        assert_eq!(resp.error.unwrap().code, ERR_CODE_NO_METHOD);
    }

    #[tokio::test]
    async fn test_initialize_echoes_supported_version() {
        let srv = test_server();
        let params = json!({
            "protocolVersion": "2025-03-26",
            "capabilities": {},
            "clientInfo": {"name": "test", "version": "0.1"}
        });
        let resp = call(&srv, "initialize", Some(params)).await;
        assert!(resp.error.is_none());
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], "2025-03-26");
        assert_eq!(result["serverInfo"]["name"], "test-server");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn test_initialize_unknown_version_gets_latest() {
        let srv = test_server();
        let params = json!({"protocolVersion": "1999-01-01"});
        let resp = call(&srv, "initialize", Some(params)).await;
        assert_eq!(resp.result.unwrap()["protocolVersion"], PROTOCOL_VERSION);
    }

    #[test]
    fn test_negotiate_protocol_version() {
        assert_eq!(negotiate_protocol_version(Some("2024-11-05")), "2024-11-05");
        assert_eq!(negotiate_protocol_version(Some("bogus")), PROTOCOL_VERSION);
        assert_eq!(negotiate_protocol_version(None), PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_ping() {
        let srv = test_server();
        let resp = call(&srv, "ping", None).await;
        assert!(resp.error.is_none());
        assert_eq!(resp.result.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_null_id_is_invalid_request() {
        let srv = test_server();
        let params = json!({"name": "echo", "arguments": {"msg": "hello"}});
        let resp = srv
            .handle(make_req("tools/call", Some(Value::Null), Some(params)))
            .await;
        assert!(!resp.is_notification());
        assert_eq!(resp.error_ref().map(|e| e.code), Some(ERR_CODE_INVALID_REQ));
        assert_eq!(resp.into_json_rpc().id, None);
    }

    #[tokio::test]
    async fn test_notifications_return_sentinel() {
        let srv = test_server();
        let resp = srv
            .handle(make_req("notifications/initialized", None, None))
            .await;
        assert!(resp.is_notification());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let srv = test_server();
        let resp = call(&srv, "tools/list", None).await;
        assert!(resp.error.is_none());
        let result = resp.result.unwrap();
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "echo");
        assert_eq!(tools[0]["title"], "Echo");
        assert_eq!(tools[0]["inputSchema"]["required"], json!(["msg"]));
    }

    #[test]
    fn test_tools_list_keeps_authored_schema_order() {
        let srv = test_server();
        assert!(srv
            .tools_list
            .get()
            .contains(r#""inputSchema":{"type":"object","properties":{"msg":{"type":"string"}},"required":["msg"]}"#));
    }

    #[tokio::test]
    async fn test_tools_call_success() {
        let srv = test_server();
        let params = json!({"name": "echo", "arguments": {"msg": "hello"}});
        let resp = call(&srv, "tools/call", Some(params)).await;
        assert!(resp.error.is_none());
        let result: ToolResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(result.content[0].text.as_deref(), Some("echo: hello"));
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn test_tools_call_missing_required() {
        let srv = test_server();
        let params = json!({"name": "echo", "arguments": {}});
        let resp = call(&srv, "tools/call", Some(params)).await;
        assert_eq!(resp.error.unwrap().code, ERR_CODE_BAD_PARAMS);
    }

    #[tokio::test]
    async fn test_tools_call_without_arguments() {
        let srv = test_server();
        let params = json!({"name": "echo"});
        let resp = call(&srv, "tools/call", Some(params)).await;
        assert_eq!(resp.error.unwrap().code, ERR_CODE_BAD_PARAMS);
    }

    #[tokio::test]
    async fn test_tools_call_missing_params() {
        let srv = test_server();
        let resp = call(&srv, "tools/call", None).await;
        assert_eq!(resp.error.unwrap().code, ERR_CODE_BAD_PARAMS);
    }

    #[tokio::test]
    async fn test_tools_call_unknown_tool() {
        let srv = test_server();
        let params = json!({"name": "nonexistent", "arguments": {}});
        let resp = call(&srv, "tools/call", Some(params)).await;
        assert_eq!(resp.error.unwrap().code, ERR_CODE_NO_METHOD);
    }

    #[test]
    fn test_build_missing_handler() {
        let err = Server::builder()
            .tools_json(ECHO_JSON.as_bytes())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, McpError::MissingHandler(name) if name == "echo"));
    }

    #[test]
    fn test_build_handler_without_definition() {
        let mut builder = Server::builder().tools_json(ECHO_JSON.as_bytes());
        builder.handle_tool("echo", Arc::new(EchoHandler));
        builder.handle_tool("ghost", Arc::new(EchoHandler));
        let err = builder.build().err().unwrap();
        assert!(matches!(err, McpError::UnknownHandler(name) if name == "ghost"));
    }

    #[test]
    fn test_build_duplicate_definition() {
        let mut builder = Server::builder()
            .tools_json(ECHO_JSON.as_bytes())
            .tools_json(ECHO_JSON.as_bytes());
        builder.handle_tool("echo", Arc::new(EchoHandler));
        let err = builder.build().err().unwrap();
        assert!(matches!(err, McpError::DuplicateTool(name) if name == "echo"));
    }

    #[test]
    fn test_build_reports_load_error() {
        let err = Server::builder()
            .tools_json(b"{not json")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, McpError::Json(_)));
    }

    #[tokio::test]
    async fn test_build_from_tools_file() {
        let path = std::env::temp_dir().join(format!("mcp-boilerplate-tools-{}.json", std::process::id()));
        std::fs::write(&path, ECHO_JSON).unwrap();
        let mut builder = Server::builder().tools_file(&path);
        std::fs::remove_file(&path).unwrap();
        builder.handle_tool("echo", Arc::new(EchoHandler));
        let srv = builder.build().unwrap();

        let params = json!({"name": "echo", "arguments": {"msg": "from file"}});
        let resp = call(&srv, "tools/call", Some(params)).await;
        assert_eq!(resp.result.unwrap()["content"][0]["text"], "echo: from file");
    }

    #[test]
    fn test_build_missing_tools_file() {
        let path = std::env::temp_dir().join("mcp-boilerplate-does-not-exist.json");
        let err = Server::builder().tools_file(&path).build().err().unwrap();
        assert!(matches!(err, McpError::Io(_)));
    }

    #[tokio::test]
    async fn test_build_from_tool_values() {
        let tool = loader::parse_tool(json!({
            "name": "echo",
            "description": "echoes",
            "inputSchema": {"type": "object", "properties": {"msg": {"type": "string"}}},
        }))
        .unwrap();
        let mut builder = Server::builder().tools(vec![tool]);
        builder.handle_tool("echo", Arc::new(EchoHandler));
        let srv = builder.build().unwrap();

        let params = json!({"name": "echo", "arguments": {}});
        let resp = call(&srv, "tools/call", Some(params)).await;
        assert_eq!(resp.result.unwrap()["content"][0]["text"], "echo: no msg");
    }

    #[test]
    fn test_build_default_server_info() {
        let srv = Server::builder().build().unwrap();
        assert_eq!(srv.server_name, "mcp-boilerplate");
        assert_eq!(srv.server_version, "1.0.0");
        assert!(srv.dispatcher().registry().is_empty());
    }

    #[tokio::test]
    async fn test_from_registry() {
        let mut registry = ToolRegistry::new();
        let tools = loader::parse_tools(ECHO_JSON.as_bytes()).unwrap();
        for tool in tools {
            registry
                .register(
                    tool,
                    FnToolHandler::new(|_args: Value| async move { Ok(text_result("direct")) }),
                )
                .unwrap();
        }
        let srv = Server::from_registry("direct", "9.9.9", registry).unwrap();
        let params = json!({"name": "echo", "arguments": {"msg": "x"}});
        let resp = call(&srv, "tools/call", Some(params)).await;
        assert_eq!(resp.result.unwrap()["content"][0]["text"], "direct");
    }
}
