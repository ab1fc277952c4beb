//! Agent Hub Gateway - HTTP session API and WebSocket event stream

pub mod audit;
pub mod events;
pub mod server;
pub mod store;
pub mod ws;

pub use audit::{AuditTrail, FileChangeRecord, TokenUsageRecord, ToolCallRecord, TranscriptMessage};
pub use events::{fold_into_history, to_wire};
pub use server::{build_router, start_server, AppState};
pub use store::{InMemorySessionStore, Session, SessionStore};
