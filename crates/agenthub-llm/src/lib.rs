//! Agent Hub LLM - model gateway trait and the OpenAI-compatible client

pub mod openai;
pub mod provider;
pub mod types;

pub use openai::OpenAiCompatGateway;
pub use provider::{GatewayError, GatewayResult, ModelGateway};
pub use types::*;
