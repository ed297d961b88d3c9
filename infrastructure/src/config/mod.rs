//! Configuration boundary: resolved settings plus the one-time environment
//! snapshot.

pub mod env;
pub mod settings;

pub use settings::{Settings, DEFAULT_REFRESH_DAYS};
