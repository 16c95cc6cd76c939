//! Tool invocation contract
//!
//! A [`Tool`] pairs a [`ToolDefinition`] with a [`ToolHandler`]. Handlers
//! accept named arguments matching the declared inputs and return a value
//! matching the declared output. Nothing else is imposed on them.
//!
//! Synchronous capabilities can be wrapped with [`Tool::from_fn`]; anything
//! that suspends (HTTP, processes) implements [`ToolHandler`] directly.

use async_trait::async_trait;
use std::sync::Arc;

use super::entities::ToolDefinition;
use super::value_objects::{ToolError, ToolResponse};

/// Named arguments passed to a tool.
pub type ToolArgs = serde_json::Map<String, serde_json::Value>;

/// Uniform invocation handle for a tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, args: &ToolArgs) -> Result<ToolResponse, ToolError>;
}

/// Adapter turning a plain closure into a [`ToolHandler`].
pub struct FnToolHandler<F> {
    f: F,
}

impl<F> FnToolHandler<F>
where
    F: Fn(&ToolArgs) -> Result<ToolResponse, ToolError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> ToolHandler for FnToolHandler<F>
where
    F: Fn(&ToolArgs) -> Result<ToolResponse, ToolError> + Send + Sync,
{
    async fn invoke(&self, args: &ToolArgs) -> Result<ToolResponse, ToolError> {
        (self.f)(args)
    }
}

/// A registered capability: definition plus invocation handle.
#[derive(Clone)]
pub struct Tool {
    pub definition: ToolDefinition,
    pub handler: Arc<dyn ToolHandler>,
}

impl Tool {
    pub fn new(definition: ToolDefinition, handler: impl ToolHandler + 'static) -> Self {
        Self {
            definition,
            handler: Arc::new(handler),
        }
    }

    pub fn from_arc(definition: ToolDefinition, handler: Arc<dyn ToolHandler>) -> Self {
        Self {
            definition,
            handler,
        }
    }

    /// Wrap a synchronous closure; the definition is marked non-async.
    pub fn from_fn<F>(definition: ToolDefinition, f: F) -> Self
    where
        F: Fn(&ToolArgs) -> Result<ToolResponse, ToolError> + Send + Sync + 'static,
    {
        Self::new(definition.synchronous(), FnToolHandler::new(f))
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}
