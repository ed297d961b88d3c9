//! Provider adapters
//!
//! One HTTP gateway covers every configured provider; local runtimes get a
//! pre-session model validation pass on top.

pub mod openai_compat;
pub mod validation;

pub use openai_compat::{HttpLlmGateway, HttpSession};
