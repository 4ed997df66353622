use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::{McpError, Tool, ToolResult};

/// Handler trait for MCP tools. Implement this or use closures.
///
/// `args` has already passed schema validation and only holds declared
/// fields. Return `Ok` with an error result for expected business failures;
/// an `Err` is treated as a fault and hidden from the caller.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Value) -> Result<ToolResult, McpError>;
}

/// Wraps an async closure over raw JSON arguments into a ToolHandler.
pub struct FnToolHandler<F> {
    f: F,
}

impl<F, Fut> FnToolHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolResult, McpError>> + Send + 'static,
{
    pub fn new(f: F) -> Arc<dyn ToolHandler> {
        Arc::new(Self { f })
    }
}

#[async_trait]
impl<F, Fut> ToolHandler for FnToolHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolResult, McpError>> + Send + 'static,
{
    async fn call(&self, args: Value) -> Result<ToolResult, McpError> {
        (self.f)(args).await
    }
}

/// Wraps an async closure over a typed argument struct into a ToolHandler.
///
/// Validated arguments are deserialized into `A` before the closure runs.
/// A mismatch between `A` and the tool's schema surfaces as
/// [`McpError::Validation`].
pub struct TypedToolHandler<A, F> {
    f: F,
    _args: PhantomData<fn() -> A>,
}

impl<A, F, Fut> TypedToolHandler<A, F>
where
    A: DeserializeOwned + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolResult, McpError>> + Send + 'static,
{
    pub fn new(f: F) -> Arc<dyn ToolHandler> {
        Arc::new(Self {
            f,
            _args: PhantomData,
        })
    }
}

#[async_trait]
impl<A, F, Fut> ToolHandler for TypedToolHandler<A, F>
where
    A: DeserializeOwned + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolResult, McpError>> + Send + 'static,
{
    async fn call(&self, args: Value) -> Result<ToolResult, McpError> {
        let typed: A =
            serde_json::from_value(args).map_err(|e| McpError::Validation(e.to_string()))?;
        (self.f)(typed).await
    }
}

/// A tool definition paired with its implementation.
#[derive(Clone)]
pub struct RegisteredTool {
    pub tool: Tool,
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("tool", &self.tool.name)
            .finish_non_exhaustive()
    }
}

/// The set of callable tools, keyed by name.
///
/// Built once at startup and read-only afterwards; the dispatcher shares it
/// behind an `Arc` without locking.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool under its name. Names are unique: a second registration
    /// under the same name fails and leaves the registry untouched.
    pub fn register(&mut self, tool: Tool, handler: Arc<dyn ToolHandler>) -> Result<(), McpError> {
        if self.tools.contains_key(&tool.name) {
            return Err(McpError::DuplicateTool(tool.name));
        }
        self.order.push(tool.name.clone());
        self.tools
            .insert(tool.name.clone(), RegisteredTool { tool, handler });
        Ok(())
    }

    /// Find a tool by name.
    pub fn lookup(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// Tool definitions in registration order.
    pub fn tools(&self) -> impl Iterator<Item = &Tool> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|entry| &entry.tool)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
