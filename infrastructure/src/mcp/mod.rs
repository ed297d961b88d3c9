//! MCP client side: config import, connection, and the tool-source adapter.

pub mod connector;
pub mod import;

pub use connector::{McpConnector, McpFailure, McpToolSource};
pub use import::import_file;
