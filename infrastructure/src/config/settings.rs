//! Resolved run configuration
//!
//! The boundary object handed from the CLI to setup. Everything here is
//! already parsed and validated; defaults are applied at construction.

use llmux_domain::{ConfiguredModel, McpServerDescriptor, ProviderEnv};

/// Default registry refresh interval, in days
pub const DEFAULT_REFRESH_DAYS: u64 = 7;

/// Everything one run needs, resolved from flags and environment
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Model slots in configuration order
    pub models: Vec<ConfiguredModel>,
    /// Paths to local tool definition files
    pub tool_paths: Vec<String>,
    /// Substring patterns for the tool allow-list (empty: allow all)
    pub allowed_tools: Vec<String>,
    /// Substring patterns for the tool reject-list
    pub rejected_tools: Vec<String>,
    /// MCP servers to connect, already filtered by use/skip lists
    pub mcp_servers: Vec<McpServerDescriptor>,
    /// Synthesize one consensus answer instead of per-model responses
    pub consensus: bool,
    /// Model registry staleness bound; 0 forces a refresh
    pub refresh_days: u64,
    /// Provider environment snapshot
    pub provider_env: ProviderEnv,
}

impl Settings {
    pub fn new(models: Vec<ConfiguredModel>) -> Self {
        Self {
            models,
            refresh_days: DEFAULT_REFRESH_DAYS,
            ..Self::default()
        }
    }
}
