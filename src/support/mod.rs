//! Emotion-support service behind the chat endpoint.
//!
//! - `emotion`: keyword classifier with crisis detection
//! - `responder`: templated replies and help resources
//! - `store`: `SQLite` sessions and message history
//! - `cleanup`: background session expiry
//! - `service`: per-turn orchestration used by the HTTP routes

pub mod cleanup;
pub mod emotion;
pub mod errors;
pub mod responder;
pub mod service;
pub mod store;

pub use cleanup::{CleanupConfig, SessionCleanup};
pub use emotion::{Emotion, EmotionClassifier, EmotionReading, SeverityLevel};
pub use errors::{SupportError, SupportResult};
pub use responder::ResponseGenerator;
pub use service::SupportService;
pub use store::{
    ConversationTurn, ExpiryStats, NewMessage, SessionHandle, SessionOpen, SessionRecord,
    SessionStore, SqliteSessionStore, StoreFuture,
};
