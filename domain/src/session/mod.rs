//! Conversation messages and ordering helpers

pub mod conversation;
pub mod entities;
