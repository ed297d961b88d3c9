//! LLM Gateway port
//!
//! Defines the interface for communicating with LLM providers.
//! Implementations (adapters) live in the infrastructure layer.

use async_trait::async_trait;
use llmux_domain::{Message, ModelReply, ModelSpec, ToolDefinition};
use thiserror::Error;

/// Errors that can occur during provider operations
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Tool {tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("Operation {0} not supported by this session")]
    UnsupportedOperation(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

impl SessionError {
    /// Short class-like name of this error, used in user-facing diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::ConnectionError(_) => "ConnectionError",
            SessionError::ModelNotAvailable(_) => "ModelNotAvailable",
            SessionError::RequestFailed(_) => "RequestFailed",
            SessionError::ToolFailed { .. } => "ToolFailed",
            SessionError::UnsupportedOperation(_) => "UnsupportedOperation",
            SessionError::Timeout => "Timeout",
            SessionError::Other(_) => "Other",
        }
    }
}

/// Gateway for LLM communication
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Check that a model actually exists on its provider.
    ///
    /// Local providers have no hosted registry, so this issues a request
    /// against their model-listing endpoint. Hosted providers are a no-op.
    async fn validate_model(&self, spec: &ModelSpec) -> Result<(), SessionError>;

    /// Create an isolated session bound to the resolved provider/model,
    /// with the given tool set attached.
    async fn create_session(
        &self,
        spec: &ModelSpec,
        tools: &[ToolDefinition],
    ) -> Result<Box<dyn LlmSession>, SessionError>;
}

/// An active, isolated LLM session
///
/// Each session owns its own message history; sessions for different model
/// slots never share mutable conversation state, even when they reference
/// the same underlying model name.
#[async_trait]
pub trait LlmSession: Send + Sync {
    /// The model slot this session is bound to
    fn spec(&self) -> &ModelSpec;

    /// Send a text turn and get the provider result
    async fn send(&self, content: &str) -> Result<ModelReply, SessionError>;

    /// Send a turn that attaches an image for a vision-capable model
    async fn send_image(&self, image_path: &str, content: &str) -> Result<ModelReply, SessionError> {
        let _ = (image_path, content);
        Err(SessionError::UnsupportedOperation("image_to_text".into()))
    }

    /// Generate an image from a text prompt
    async fn generate_image(&self, content: &str) -> Result<ModelReply, SessionError> {
        let _ = content;
        Err(SessionError::UnsupportedOperation("text_to_image".into()))
    }

    /// Generate speech audio from a text prompt
    async fn generate_audio(&self, content: &str) -> Result<ModelReply, SessionError> {
        let _ = content;
        Err(SessionError::UnsupportedOperation("text_to_audio".into()))
    }

    /// Transcribe an audio file to text
    async fn transcribe(&self, audio_path: &str) -> Result<ModelReply, SessionError> {
        let _ = audio_path;
        Err(SessionError::UnsupportedOperation("audio_to_text".into()))
    }

    /// Snapshot of the session's message log
    fn messages(&self) -> Vec<Message>;

    /// Append a message to the log (used by the repair pass)
    fn push_message(&self, message: Message);

    /// Discard conversation history in place
    fn reset(&self) -> Result<(), SessionError>;

    /// Clear only the message log; must not fail
    fn clear_log(&self);
}
