//! Application layer for llmux
//!
//! This crate contains the port definitions and the use cases that drive a
//! conversation turn: session management, modality routing, multi-model
//! fan-out with optional consensus, and tool-call repair after a failed
//! tool-augmented turn. It depends only on the domain layer.

pub mod orchestrator;
pub mod ports;
pub mod repair;
pub mod router;
pub mod sessions;
pub mod setup;
pub mod tools;

// Re-export commonly used types
pub use orchestrator::{ChatResult, MultiModelOrchestrator};
pub use ports::{
    llm_gateway::{LlmGateway, LlmSession, SessionError},
    tool_source::{ToolSource, ToolSourceError},
};
pub use repair::{handle_tool_crash, repair_incomplete_tool_calls};
pub use router::ModalityRouter;
pub use sessions::SessionManager;
pub use setup::{AdapterSetup, SetupReport};
pub use tools::ToolRouter;
