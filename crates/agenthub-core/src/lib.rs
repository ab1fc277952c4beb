//! Agent Hub Core - Types, wire protocol, settings, and error handling

pub mod config;
pub mod error;
pub mod protocol;
pub mod types;

pub use config::{BindMode, ServerSettings, Settings, FUNCTION_CALLING_MODELS};
pub use error::{Error, Result};
pub use protocol::*;
pub use types::*;
