//! MCP server descriptors and the use/skip filter

pub mod descriptor;
