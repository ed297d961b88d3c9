//! Ports - interfaces implemented by infrastructure adapters

pub mod llm_gateway;
pub mod tool_source;
