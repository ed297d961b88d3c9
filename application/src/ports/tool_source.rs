//! Tool source port
//!
//! A tool source contributes candidate tool definitions (local files, MCP
//! servers) and executes calls routed back to it.

use async_trait::async_trait;
use llmux_domain::ToolDefinition;
use thiserror::Error;

/// Errors raised by a tool source
#[derive(Error, Debug)]
pub enum ToolSourceError {
    #[error("Tool discovery failed: {0}")]
    DiscoveryFailed(String),

    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool {tool} failed: {message}")]
    InvocationFailed { tool: String, message: String },
}

/// A provider of invocable tools
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Stable identifier used in diagnostics
    fn id(&self) -> &str;

    /// Enumerate the tools this source offers
    async fn discover(&self) -> Result<Vec<ToolDefinition>, ToolSourceError>;

    /// Execute one tool call and return its textual result
    async fn invoke(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<String, ToolSourceError>;
}
