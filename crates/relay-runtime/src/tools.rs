mod builtin;

pub use builtin::CurrentTimeTool;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use relay_types::{ToolCall, ToolOutput};
use serde_json::{json, Value};
use thiserror::Error;

/// Failure reported by a tool implementation
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Execution(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolRegistryError {
    #[error("tool name must not be empty")]
    EmptyName,

    #[error("tool registered twice: {0}")]
    DuplicateName(String),
}

/// Local implementation of a function tool the assistant may call
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Function name as declared on the assistant
    fn name(&self) -> &str;

    async fn execute(&self, args: Value) -> Result<Value, ToolError>;
}

/// Outcome of one dispatched tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub output: ToolOutput,
    pub is_error: bool,
}

impl ToolResult {
    fn ok(call: &ToolCall, value: Value) -> Self {
        let output = match value {
            Value::String(text) => text,
            other => other.to_string(),
        };
        Self {
            output: ToolOutput::new(&call.id, output),
            is_error: false,
        }
    }

    fn error(call: &ToolCall, kind: &str, message: String) -> Self {
        let payload = json!({ "error": message, "kind": kind });
        Self {
            output: ToolOutput::new(&call.id, payload.to_string()),
            is_error: true,
        }
    }
}

/// Name → handler map, fixed once built
#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: BTreeMap<String, Arc<dyn ToolHandler>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// Registry holding the built-in tools only
    pub fn with_builtins() -> Self {
        let mut handlers: BTreeMap<String, Arc<dyn ToolHandler>> = BTreeMap::new();
        let time: Arc<dyn ToolHandler> = Arc::new(CurrentTimeTool);
        handlers.insert(time.name().to_string(), time);
        Self { handlers }
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Declared function names that have no local handler
    pub fn lint(&self, declared: &[String]) -> Vec<String> {
        declared
            .iter()
            .filter(|name| !self.handlers.contains_key(name.as_str()))
            .cloned()
            .collect()
    }

    /// Run every call of one pause concurrently.
    ///
    /// Results come back in call order, and every call gets an output even
    /// when the tool is unknown or fails.
    pub async fn dispatch(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        join_all(calls.iter().map(|call| self.dispatch_one(call))).await
    }

    async fn dispatch_one(&self, call: &ToolCall) -> ToolResult {
        let Some(handler) = self.handlers.get(&call.name) else {
            tracing::warn!(tool = %call.name, tool_call_id = %call.id, "No handler registered for tool");
            return ToolResult::error(
                call,
                "unknown_tool",
                format!("Tool {} is not implemented", call.name),
            );
        };

        let args = match parse_arguments(&call.arguments) {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool arguments are not valid JSON");
                return ToolResult::error(call, "invalid_arguments", e.to_string());
            }
        };

        let start = Instant::now();
        let result = handler.execute(args).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(value) => {
                tracing::debug!(tool = %call.name, duration_ms, "Tool executed");
                ToolResult::ok(call, value)
            }
            Err(ToolError::InvalidArguments(msg)) => {
                tracing::warn!(tool = %call.name, error = %msg, "Tool rejected arguments");
                ToolResult::error(call, "invalid_arguments", msg)
            }
            Err(ToolError::Execution(msg)) => {
                tracing::warn!(tool = %call.name, duration_ms, error = %msg, "Tool execution failed");
                ToolResult::error(call, "execution_failed", msg)
            }
        }
    }
}

fn parse_arguments(raw: &str) -> Result<Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw)
}

#[derive(Default)]
pub struct ToolRegistryBuilder {
    handlers: Vec<Arc<dyn ToolHandler>>,
}

impl ToolRegistryBuilder {
    pub fn register<T>(mut self, handler: T) -> Self
    where
        T: ToolHandler + 'static,
    {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn register_arc(mut self, handler: Arc<dyn ToolHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn with_builtins(self) -> Self {
        self.register(CurrentTimeTool)
    }

    pub fn build(self) -> Result<ToolRegistry, ToolRegistryError> {
        let mut seen = HashSet::new();
        let mut handlers = BTreeMap::new();

        for handler in self.handlers {
            let name = handler.name().to_string();
            if name.trim().is_empty() {
                return Err(ToolRegistryError::EmptyName);
            }
            if !seen.insert(name.clone()) {
                return Err(ToolRegistryError::DuplicateName(name));
            }
            handlers.insert(name, handler);
        }

        Ok(ToolRegistry { handlers })
    }
}
