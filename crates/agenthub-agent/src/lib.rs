//! Agent Hub Agent - the tool-using agent loop
//!
//! The loop is session-agnostic: callers hand it the prior history, the
//! workspace and the agent type, and consume a lazy stream of events.

pub mod event;
pub mod prompts;
pub mod runtime;
pub mod sanitizer;
pub mod usage;

pub use event::AgentEvent;
pub use prompts::system_prompt;
pub use runtime::{AgentConfig, AgentLoop, AgentStream, RunRequest, MAX_ITERATIONS_MESSAGE};
pub use sanitizer::{parse_history, sanitize};
pub use usage::{Pricing, UsageAccumulator};
