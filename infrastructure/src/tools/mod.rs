//! Tool sources backed by the local filesystem.

pub mod local;

pub use local::LocalToolSource;
