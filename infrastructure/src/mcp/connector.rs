//! MCP server connector
//!
//! Launches each configured server as a child process over the stdio MCP
//! transport, runs the capabilities handshake under the server's own
//! timeout, and classifies failures into four distinct shapes so the status
//! report can tell "the binary would not start" from "it started but never
//! answered". Attempts are independent and concurrent; one server's failure
//! never blocks another's attempt.

use async_trait::async_trait;
use llmux_application::ports::tool_source::{ToolSource, ToolSourceError};
use llmux_domain::{McpServerDescriptor, ToolDefinition};
use rmcp::{
    service::{RoleClient, RunningService},
    transport::TokioChildProcess,
    ServiceExt,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

/// Why a server did not come up
#[derive(Error, Debug)]
pub enum McpFailure {
    #[error("process not alive: {0}")]
    ProcessNotAlive(String),

    #[error("handshake timed out with no capabilities")]
    HandshakeTimeout,

    #[error("handshake produced empty capabilities (no tools advertised)")]
    EmptyCapabilities,

    #[error("handshake produced malformed capabilities: {0}")]
    MalformedCapabilities(String),
}

/// Outcome of all connection attempts
pub struct McpConnector {
    connected: Vec<Arc<McpToolSource>>,
    failed: Vec<(String, McpFailure)>,
}

impl McpConnector {
    /// Attempt every server concurrently, each under its own timeout.
    pub async fn connect_all(servers: &[McpServerDescriptor]) -> Self {
        let attempts = servers.iter().map(connect_one);
        let results = futures::future::join_all(attempts).await;

        let mut connected = Vec::new();
        let mut failed = Vec::new();
        for (descriptor, result) in servers.iter().zip(results) {
            match result {
                Ok(source) => {
                    info!(
                        server = %descriptor.name,
                        tools = source.tools.len(),
                        "MCP server connected"
                    );
                    connected.push(Arc::new(source));
                }
                Err(failure) => {
                    warn!(server = %descriptor.name, error = %failure, "MCP connection failed");
                    failed.push((descriptor.name.clone(), failure));
                }
            }
        }

        Self { connected, failed }
    }

    /// Connected servers as tool sources for the registry.
    pub fn sources(&self) -> Vec<Arc<dyn ToolSource>> {
        self.connected
            .iter()
            .map(|s| Arc::clone(s) as Arc<dyn ToolSource>)
            .collect()
    }

    pub fn failures(&self) -> &[(String, McpFailure)] {
        &self.failed
    }

    /// One human-readable status line per attempted server, on stderr.
    pub fn report(&self) {
        for source in &self.connected {
            eprintln!(
                "MCP server {}: connected ({} tools)",
                source.server_name,
                source.tools.len()
            );
        }
        for (name, failure) in &self.failed {
            eprintln!("MCP server {}: failed ({})", name, failure);
        }
        if self.connected.is_empty() {
            eprintln!("No MCP servers connected");
        }
    }
}

/// Launch, handshake, and list tools for one server.
async fn connect_one(descriptor: &McpServerDescriptor) -> Result<McpToolSource, McpFailure> {
    let timeout = descriptor.timeout();

    let mut command = Command::new(&descriptor.command);
    command.args(&descriptor.args);
    for (key, value) in &descriptor.env {
        command.env(key, value);
    }

    let transport = TokioChildProcess::new(command)
        .map_err(|e| McpFailure::ProcessNotAlive(e.to_string()))?;

    let service = tokio::time::timeout(timeout, ().serve(transport))
        .await
        .map_err(|_| McpFailure::HandshakeTimeout)?
        .map_err(|e| McpFailure::ProcessNotAlive(e.to_string()))?;

    let listing = tokio::time::timeout(timeout, service.list_tools(Default::default()))
        .await
        .map_err(|_| McpFailure::HandshakeTimeout)?
        .map_err(|e| McpFailure::MalformedCapabilities(e.to_string()))?;

    // Work on the serialized form so the advertised schema shape is checked
    // in one place.
    let advertised = serde_json::to_value(&listing)
        .map_err(|e| McpFailure::MalformedCapabilities(e.to_string()))?;
    let tools = convert_tools(&descriptor.name, &advertised)
        .map_err(McpFailure::MalformedCapabilities)?;
    if tools.is_empty() {
        return Err(McpFailure::EmptyCapabilities);
    }

    Ok(McpToolSource {
        id: format!("mcp:{}", descriptor.name),
        server_name: descriptor.name.clone(),
        timeout,
        service,
        tools,
    })
}

fn convert_tools(server: &str, advertised: &Value) -> Result<Vec<ToolDefinition>, String> {
    let listed = advertised
        .get("tools")
        .and_then(Value::as_array)
        .ok_or_else(|| "tool list missing from capabilities".to_string())?;

    let mut tools = Vec::with_capacity(listed.len());
    for entry in listed {
        let name = entry
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| "advertised tool without a name".to_string())?;
        let description = entry
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let parameters = entry
            .get("inputSchema")
            .cloned()
            .unwrap_or_else(|| json!({ "type": "object", "properties": {} }));
        tools.push(ToolDefinition::mcp(name, description, parameters, server));
    }
    Ok(tools)
}

/// A connected server exposed to the tool registry
pub struct McpToolSource {
    id: String,
    server_name: String,
    timeout: Duration,
    service: RunningService<RoleClient, ()>,
    tools: Vec<ToolDefinition>,
}

#[async_trait]
impl ToolSource for McpToolSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn discover(&self) -> Result<Vec<ToolDefinition>, ToolSourceError> {
        Ok(self.tools.clone())
    }

    async fn invoke(&self, name: &str, arguments: Value) -> Result<String, ToolSourceError> {
        let request = serde_json::from_value(json!({
            "name": name,
            "arguments": arguments,
        }))
        .map_err(|e| ToolSourceError::InvocationFailed {
            tool: name.to_string(),
            message: format!("unencodable arguments: {}", e),
        })?;

        let result = tokio::time::timeout(self.timeout, self.service.call_tool(request))
            .await
            .map_err(|_| ToolSourceError::InvocationFailed {
                tool: name.to_string(),
                message: format!("{} timed out", self.server_name),
            })?
            .map_err(|e| ToolSourceError::InvocationFailed {
                tool: name.to_string(),
                message: e.to_string(),
            })?;

        let payload = serde_json::to_value(&result).map_err(|e| {
            ToolSourceError::InvocationFailed {
                tool: name.to_string(),
                message: format!("unreadable result: {}", e),
            }
        })?;

        let text = collect_text(&payload);
        if payload.get("isError").and_then(Value::as_bool).unwrap_or(false) {
            return Err(ToolSourceError::InvocationFailed {
                tool: name.to_string(),
                message: if text.is_empty() {
                    "tool reported an error".to_string()
                } else {
                    text
                },
            });
        }
        Ok(text)
    }
}

/// Concatenate the text blocks of a call result.
fn collect_text(payload: &Value) -> String {
    payload
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}
