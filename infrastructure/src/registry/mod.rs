//! Cached model metadata (modalities per known model id).

pub mod cache;

pub use cache::{ModelRegistry, RegistryEntry};
