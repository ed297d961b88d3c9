//! Infrastructure layer for llmux
//!
//! Concrete adapters behind the application-layer ports: the HTTP gateway
//! speaking the OpenAI-compatible dialect (with local-provider validation),
//! the cached model registry, the MCP connector with its tool-source
//! adapter, file-defined local tools, and the configuration boundary.

pub mod config;
pub mod mcp;
pub mod providers;
pub mod registry;
pub mod tools;

// Re-export commonly used types
pub use config::{Settings, DEFAULT_REFRESH_DAYS};
pub use mcp::{McpConnector, McpFailure, McpToolSource};
pub use providers::{HttpLlmGateway, HttpSession};
pub use registry::ModelRegistry;
pub use tools::LocalToolSource;
