//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("No models configured")]
    NoModels,

    #[error("Unknown model spec: {0}")]
    UnknownModel(String),

    #[error("No modality of model {model} matches the prompt (supported: {supported})")]
    NoMatchingModality { model: String, supported: String },
}
