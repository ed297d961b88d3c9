//! Tool definitions and the filter pipeline
//!
//! Tools come from two origins: local files and MCP servers. The registry
//! pipeline runs gather -> allow -> reject -> dedup, in that order, so an
//! allow-list can reference either copy of a tool that deduplication would
//! later collapse.

pub mod entities;
pub mod filter;
