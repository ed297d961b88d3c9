//! Tool domain entities

use serde::{Deserialize, Serialize};

/// Where a tool definition came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum ToolOrigin {
    /// Defined in a local tool file
    Local { path: String },
    /// Advertised by an MCP server
    Mcp { server: String },
}

impl std::fmt::Display for ToolOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolOrigin::Local { path } => write!(f, "local:{}", path),
            ToolOrigin::Mcp { server } => write!(f, "mcp:{}", server),
        }
    }
}

/// A named, invocable capability exposed to every session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON schema for the tool's parameters
    pub parameters: serde_json::Value,
    /// Origin of this definition
    pub origin: ToolOrigin,
}

impl ToolDefinition {
    pub fn local(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            origin: ToolOrigin::Local { path: path.into() },
        }
    }

    pub fn mcp(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
        server: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            origin: ToolOrigin::Mcp {
                server: server.into(),
            },
        }
    }
}
