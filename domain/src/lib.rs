//! Domain layer for llmux
//!
//! This crate contains the core entities and pure logic of the adapter:
//! model specs, provider resolution, modality routing predicates, tool
//! filtering, MCP server descriptors, and conversation messages. It has no
//! dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! - **ModelSpec**: one configured model slot. The same model name may be
//!   configured twice with different roles; each slot gets its own spec and
//!   its own isolated session downstream.
//! - **Modality**: an input/output medium (text, image, audio). Routing picks
//!   exactly one chat operation per model and prompt shape.
//! - **Consensus**: multi-model operation that reduces independent answers
//!   into one synthesized answer via an additional model call.

pub mod error;
pub mod mcp;
pub mod model;
pub mod response;
pub mod session;
pub mod tool;

// Re-export commonly used types
pub use error::DomainError;
pub use mcp::descriptor::{McpServerDescriptor, filter_mcp_servers};
pub use model::{
    modality::{ChatOperation, Modality, ModalitySet, Prompt},
    provider::{Provider, ProviderEnv},
    spec::{ConfiguredModel, ModelSpec},
};
pub use response::{ModelOutcome, ModelReply, MultiModelResponse, TokenUsage};
pub use session::{
    conversation::prepend_role_to_conversation,
    entities::{Message, Role, ToolCallRef},
};
pub use tool::{
    entities::{ToolDefinition, ToolOrigin},
    filter::{drop_duplicates, filter_allowed, filter_rejected},
};
