//! MCP server descriptor (Value Object)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default handshake timeout per server, in milliseconds.
pub const DEFAULT_MCP_TIMEOUT_MS: u64 = 8000;

/// One configured MCP server: how to launch it and how long to wait for the
/// capabilities handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerDescriptor {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_MCP_TIMEOUT_MS
}

impl McpServerDescriptor {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            timeout_ms: DEFAULT_MCP_TIMEOUT_MS,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

/// Apply the use-list/skip-list to the configured servers.
///
/// A non-empty use-list wins outright - only named servers are kept, even
/// when the same name also appears in the skip-list. Otherwise a non-empty
/// skip-list drops named servers. Otherwise everything is kept.
pub fn filter_mcp_servers(
    servers: Vec<McpServerDescriptor>,
    use_list: &[String],
    skip_list: &[String],
) -> Vec<McpServerDescriptor> {
    if !use_list.is_empty() {
        return servers
            .into_iter()
            .filter(|s| use_list.iter().any(|n| n == &s.name))
            .collect();
    }
    if !skip_list.is_empty() {
        return servers
            .into_iter()
            .filter(|s| !skip_list.iter().any(|n| n == &s.name))
            .collect();
    }
    servers
}
