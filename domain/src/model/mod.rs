//! Model identification, provider resolution, and modality routing predicates

pub mod modality;
pub mod provider;
pub mod spec;
