//! Wire types shared by the chat front end and the emotion-support service.
//!
//! The send-message contract is the only durable shape exchanged between the
//! two halves. The client accepts both historical payload variants (numeric or
//! labelled severity, `name` or `title` on resources); the service always emits
//! the labelled form.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Path of the send-message endpoint.
pub const SEND_MESSAGE_PATH: &str = "/api/chat/send-message";
/// Path prefix of the history endpoint (`/{session_id}` appended).
pub const HISTORY_PATH: &str = "/api/chat/history";
/// Path prefix of the session status endpoint (`/{session_id}` appended).
pub const SESSION_STATUS_PATH: &str = "/api/chat/session-status";
/// Path of the explicit session creation endpoint.
pub const START_SESSION_PATH: &str = "/api/chat/start-session";
/// Path of the analytics endpoint.
pub const DASHBOARD_STATS_PATH: &str = "/api/analytics/dashboard-stats";

/// Body of `POST /api/chat/send-message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// Trimmed user utterance.
    pub message: String,
    /// Identifier of the authenticated user.
    #[serde(default)]
    pub user_id: String,
    /// Session to continue, `null` on the first turn.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Successful body of `POST /api/chat/send-message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    /// Assistant reply text.
    pub response: String,
    /// Session the reply belongs to.
    pub session_id: String,
    /// Detected emotion label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    /// Urgency of the detected emotion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Classifier confidence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Whether help resources should be shown.
    #[serde(default, deserialize_with = "null_as_default")]
    pub needs_help: bool,
    /// Help links, shown only when `needs_help` is set.
    #[serde(default, deserialize_with = "null_as_default")]
    pub resources: Vec<Resource>,
}

/// Treat an explicit `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Urgency attached to an assistant reply.
///
/// Older service revisions sent a 0-10 number, newer ones a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Severity {
    /// Numeric urgency, bucketed for display.
    Level(f64),
    /// Pre-labelled category such as `moderate`.
    Label(String),
}

impl Severity {
    /// Human readable severity.
    ///
    /// Numbers are bucketed (≤3 Low, ≤6 Medium, ≤8 High, above Critical);
    /// labels are title-cased.
    #[must_use]
    pub fn display_text(&self) -> String {
        match self {
            Self::Level(level) => bucket_level(*level).to_string(),
            Self::Label(label) => title_case(label),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}

const fn bucket_level(level: f64) -> &'static str {
    if level <= 3.0 {
        "Low"
    } else if level <= 6.0 {
        "Medium"
    } else if level <= 8.0 {
        "High"
    } else {
        "Critical"
    }
}

fn title_case(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut at_word_start = true;
    for ch in label.chars() {
        if at_word_start && ch.is_alphabetic() {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_word_start = ch.is_whitespace() || ch == '-' || ch == '_';
    }
    out
}

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person chatting.
    User,
    /// The assistant.
    Ai,
}

impl Sender {
    /// Wire and storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "ai" => Some(Self::Ai),
            _ => None,
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A help link surfaced when `needs_help` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Display name.
    #[serde(alias = "title")]
    pub name: String,
    /// Target URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// One-line description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Resource {
    /// Build a resource with every field set.
    #[must_use]
    pub fn new(name: &str, url: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            url: Some(url.to_string()),
            description: Some(description.to_string()),
        }
    }
}

/// One stored turn returned by the history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Message text.
    pub message: String,
    /// Author of the turn.
    pub sender: Sender,
    /// Emotion recorded with the turn.
    pub emotion: Option<String>,
    /// Severity label recorded with the turn.
    pub severity: Option<String>,
    /// Confidence recorded with the turn.
    pub confidence: Option<f64>,
    /// When the turn was stored.
    pub timestamp: DateTime<Utc>,
}

/// Body of `GET /api/chat/history/{session_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatHistoryResponse {
    /// Turns, oldest first.
    pub messages: Vec<HistoryEntry>,
    /// Session the turns belong to.
    pub session_id: String,
}

/// Body of `GET /api/chat/session-status/{session_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Whether the session still accepts turns without reactivation.
    pub active: bool,
    /// Last time a turn touched the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Whole minutes left before the inactivity timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes_until_timeout: Option<u64>,
    /// Configured inactivity timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_timeout_minutes: Option<u64>,
    /// Set when the session is unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SessionStatus {
    /// Status reported for an unknown session id.
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            active: false,
            last_activity: None,
            created_at: None,
            minutes_until_timeout: None,
            session_timeout_minutes: None,
            message: Some("Session not found".to_string()),
        }
    }
}

/// Optional body of `POST /api/chat/start-session`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartSessionRequest {
    /// Owner of the new session.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Body returned by `POST /api/chat/start-session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartSessionResponse {
    /// Freshly minted session id.
    pub session_id: String,
}

/// Body of `GET /api/analytics/dashboard-stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Number of stored sessions.
    pub total_sessions: u64,
    /// Number of stored turns.
    pub total_messages: u64,
    /// Turn count per emotion label.
    pub emotion_distribution: BTreeMap<String, u64>,
    /// Turn count per severity label.
    pub severity_distribution: BTreeMap<String, u64>,
}
