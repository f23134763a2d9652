//! Entries of the chat log as the widget displays them.

use chrono::{DateTime, Local};

use crate::protocol::{Resource, SendMessageResponse, Sender, Severity};

/// Assistant text shown when a send fails for any reason.
pub const FALLBACK_TEXT: &str =
    "I'm sorry, I'm having trouble connecting right now. Please try again.";

/// One bubble in the chat log.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Sequence number of the send that produced this entry.
    pub seq: u64,
    /// Message body.
    pub text: String,
    /// Author.
    pub from: Sender,
    /// Local receipt time, display only.
    pub timestamp: DateTime<Local>,
    /// Detected emotion (assistant entries only).
    pub emotion: Option<String>,
    /// Urgency (assistant entries only).
    pub severity: Option<Severity>,
    /// Classifier confidence.
    pub confidence: Option<f64>,
    /// Whether `resources` should be rendered.
    pub needs_help: bool,
    /// Help links.
    pub resources: Vec<Resource>,
    /// Set only on the fallback entry.
    pub error: bool,
}

impl ChatMessage {
    fn bare(seq: u64, from: Sender, text: String) -> Self {
        Self {
            seq,
            text,
            from,
            timestamp: Local::now(),
            emotion: None,
            severity: None,
            confidence: None,
            needs_help: false,
            resources: Vec::new(),
            error: false,
        }
    }

    /// Entry for the user's own utterance.
    #[must_use]
    pub fn user(seq: u64, text: impl Into<String>) -> Self {
        Self::bare(seq, Sender::User, text.into())
    }

    /// Assistant entry carrying the service metadata unchanged.
    #[must_use]
    pub fn reply(seq: u64, body: SendMessageResponse) -> Self {
        Self {
            emotion: body.emotion,
            severity: body.severity,
            confidence: body.confidence,
            needs_help: body.needs_help,
            resources: body.resources,
            ..Self::bare(seq, Sender::Ai, body.response)
        }
    }

    /// Fixed apology entry for a failed send.
    #[must_use]
    pub fn fallback(seq: u64) -> Self {
        Self {
            error: true,
            ..Self::bare(seq, Sender::Ai, FALLBACK_TEXT.to_string())
        }
    }

    /// Receipt time formatted like a browser's `toLocaleTimeString`.
    #[must_use]
    pub fn display_time(&self) -> String {
        self.timestamp.format("%-I:%M:%S %p").to_string()
    }

    /// Resources to render, empty unless `needs_help` is set.
    #[must_use]
    pub fn visible_resources(&self) -> &[Resource] {
        if self.needs_help { &self.resources } else { &[] }
    }
}
