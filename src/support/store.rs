//! `SQLite` storage for chat sessions and their turns.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use crate::protocol::{DashboardStats, HistoryEntry, Sender};
use crate::support::errors::SupportResult;

/// Boxed future type for session store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A `sender: message` pair used as classification context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    /// Author of the turn.
    pub sender: Sender,
    /// Turn text.
    pub message: String,
}

/// How `get_or_create` resolved the requested session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOpen {
    /// A new row was inserted.
    Created,
    /// An active session was continued.
    Resumed,
    /// A timed-out session was revived with a fresh context.
    Reactivated,
}

/// Session resolved for an incoming turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    /// Session identifier echoed to the client.
    pub session_id: String,
    /// Resolution outcome.
    pub open: SessionOpen,
}

/// A turn to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    /// Owning session.
    pub session_id: String,
    /// Author.
    pub sender: Sender,
    /// Text.
    pub message: String,
    /// Emotion label.
    pub emotion: Option<String>,
    /// Severity label.
    pub severity: Option<String>,
    /// Classifier confidence.
    pub confidence: Option<f64>,
}

/// Stored session bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Whether the session has not timed out.
    pub is_active: bool,
    /// Last touched.
    pub last_activity: DateTime<Utc>,
    /// Created.
    pub created_at: DateTime<Utc>,
}

/// Counters from one expiry pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpiryStats {
    /// Sessions marked inactive.
    pub deactivated: usize,
    /// Messages deleted with purged sessions.
    pub purged_messages: usize,
    /// Sessions deleted.
    pub purged_sessions: usize,
}

/// Session store trait.
pub trait SessionStore: Send + Sync {
    /// Resolve the session for an incoming turn, creating or reviving it.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn get_or_create(
        &self,
        user_id: String,
        session_id: Option<String>,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, SupportResult<SessionHandle>>;

    /// Persist one turn and touch the session's activity.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn record_message(
        &self,
        message: NewMessage,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, SupportResult<()>>;

    /// Most recent turns since the session was last (re)activated, oldest first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn recent_history(
        &self,
        session_id: String,
        limit: usize,
    ) -> StoreFuture<'_, SupportResult<Vec<ConversationTurn>>>;

    /// Every stored turn of a session, oldest first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn history(&self, session_id: String) -> StoreFuture<'_, SupportResult<Vec<HistoryEntry>>>;

    /// Bookkeeping for one session, `None` if unknown.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn session_record(
        &self,
        session_id: String,
    ) -> StoreFuture<'_, SupportResult<Option<SessionRecord>>>;

    /// Aggregate counters for the analytics endpoint.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn dashboard_stats(&self) -> StoreFuture<'_, SupportResult<DashboardStats>>;

    /// Deactivate idle sessions and purge long-inactive ones.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn expire_sessions(
        &self,
        now: DateTime<Utc>,
        timeout: Duration,
        purge_after: Duration,
    ) -> StoreFuture<'_, SupportResult<ExpiryStats>>;
}

impl ToSql for Sender {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Sender {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Self::parse(text).ok_or_else(|| FromSqlError::Other(format!("unknown sender: {text}").into()))
    }
}

/// `SQLite` implementation of the session store.
pub struct SqliteSessionStore {
    conn: Connection,
}

impl SqliteSessionStore {
    /// Open (or create) the database file and its tables.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn open(path: &Path) -> SupportResult<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).await?;
        Self::init(conn).await
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if the tables cannot be created.
    pub async fn open_in_memory() -> SupportResult<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> SupportResult<Self> {
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS chat_sessions (
                    session_id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL,
                    last_activity INTEGER NOT NULL,
                    activated_at INTEGER NOT NULL,
                    is_active INTEGER NOT NULL DEFAULT 1,
                    current_emotion TEXT,
                    severity_level TEXT
                );
                CREATE TABLE IF NOT EXISTS chat_messages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    session_id TEXT NOT NULL,
                    message TEXT NOT NULL,
                    sender TEXT NOT NULL,
                    emotion TEXT,
                    severity TEXT,
                    confidence REAL,
                    timestamp INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_chat_messages_session_ts
                    ON chat_messages (session_id, timestamp);
                CREATE INDEX IF NOT EXISTS idx_chat_sessions_activity
                    ON chat_sessions (is_active, last_activity);",
            )?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }
}

impl SessionStore for SqliteSessionStore {
    fn get_or_create(
        &self,
        user_id: String,
        session_id: Option<String>,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, SupportResult<SessionHandle>> {
        Box::pin(async move {
            let now_ms = now.timestamp_millis();
            let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());

            let handle = self
                .conn
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    let existing: Option<bool> = tx
                        .query_row(
                            "SELECT is_active FROM chat_sessions WHERE session_id = ?1",
                            rusqlite::params![session_id],
                            |row| row.get(0),
                        )
                        .optional()?;

                    let open = match existing {
                        Some(true) => {
                            tx.execute(
                                "UPDATE chat_sessions SET last_activity = ?2, updated_at = ?2
                                 WHERE session_id = ?1",
                                rusqlite::params![session_id, now_ms],
                            )?;
                            SessionOpen::Resumed
                        }
                        Some(false) => {
                            tx.execute(
                                "UPDATE chat_sessions
                                 SET is_active = 1, last_activity = ?2, updated_at = ?2, activated_at = ?2
                                 WHERE session_id = ?1",
                                rusqlite::params![session_id, now_ms],
                            )?;
                            SessionOpen::Reactivated
                        }
                        None => {
                            tx.execute(
                                "INSERT INTO chat_sessions
                                 (session_id, user_id, created_at, updated_at, last_activity, activated_at, is_active)
                                 VALUES (?1, ?2, ?3, ?3, ?3, ?3, 1)",
                                rusqlite::params![session_id, user_id, now_ms],
                            )?;
                            SessionOpen::Created
                        }
                    };
                    tx.commit()?;

                    Ok(SessionHandle { session_id, open })
                })
                .await?;

            Ok(handle)
        })
    }

    fn record_message(
        &self,
        message: NewMessage,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, SupportResult<()>> {
        Box::pin(async move {
            let now_ms = now.timestamp_millis();

            self.conn
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    tx.execute(
                        "INSERT INTO chat_messages
                         (session_id, message, sender, emotion, severity, confidence, timestamp)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        rusqlite::params![
                            message.session_id,
                            message.message,
                            message.sender,
                            message.emotion,
                            message.severity,
                            message.confidence,
                            now_ms
                        ],
                    )?;

                    if message.sender == Sender::User {
                        tx.execute(
                            "UPDATE chat_sessions
                             SET current_emotion = ?2, severity_level = ?3, last_activity = ?4, updated_at = ?4
                             WHERE session_id = ?1",
                            rusqlite::params![
                                message.session_id,
                                message.emotion,
                                message.severity,
                                now_ms
                            ],
                        )?;
                    } else {
                        tx.execute(
                            "UPDATE chat_sessions SET last_activity = ?2, updated_at = ?2
                             WHERE session_id = ?1",
                            rusqlite::params![message.session_id, now_ms],
                        )?;
                    }
                    tx.commit()?;
                    Ok(())
                })
                .await?;

            Ok(())
        })
    }

    fn recent_history(
        &self,
        session_id: String,
        limit: usize,
    ) -> StoreFuture<'_, SupportResult<Vec<ConversationTurn>>> {
        Box::pin(async move {
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);

            let turns = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(
                        "SELECT sender, message FROM (
                            SELECT m.id, m.sender, m.message, m.timestamp
                            FROM chat_messages m
                            JOIN chat_sessions s ON s.session_id = m.session_id
                            WHERE m.session_id = ?1 AND m.timestamp >= s.activated_at
                            ORDER BY m.timestamp DESC, m.id DESC
                            LIMIT ?2
                        )
                        ORDER BY timestamp ASC, id ASC",
                    )?;
                    let rows = stmt.query_map(rusqlite::params![session_id, limit], |row| {
                        Ok(ConversationTurn {
                            sender: row.get(0)?,
                            message: row.get(1)?,
                        })
                    })?;
                    let turns = rows.collect::<Result<Vec<_>, _>>()?;
                    Ok(turns)
                })
                .await?;

            Ok(turns)
        })
    }

    fn history(&self, session_id: String) -> StoreFuture<'_, SupportResult<Vec<HistoryEntry>>> {
        Box::pin(async move {
            let entries = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(
                        "SELECT message, sender, emotion, severity, confidence, timestamp
                         FROM chat_messages
                         WHERE session_id = ?1
                         ORDER BY timestamp ASC, id ASC",
                    )?;
                    let rows = stmt.query_map(rusqlite::params![session_id], |row| {
                        Ok(HistoryEntry {
                            message: row.get(0)?,
                            sender: row.get(1)?,
                            emotion: row.get(2)?,
                            severity: row.get(3)?,
                            confidence: row.get(4)?,
                            timestamp: from_millis(row.get(5)?),
                        })
                    })?;
                    let entries = rows.collect::<Result<Vec<_>, _>>()?;
                    Ok(entries)
                })
                .await?;

            Ok(entries)
        })
    }

    fn session_record(
        &self,
        session_id: String,
    ) -> StoreFuture<'_, SupportResult<Option<SessionRecord>>> {
        Box::pin(async move {
            let record = self
                .conn
                .call(move |conn| {
                    let record = conn
                        .query_row(
                            "SELECT is_active, last_activity, created_at
                             FROM chat_sessions WHERE session_id = ?1",
                            rusqlite::params![session_id],
                            |row| {
                                Ok(SessionRecord {
                                    is_active: row.get(0)?,
                                    last_activity: from_millis(row.get(1)?),
                                    created_at: from_millis(row.get(2)?),
                                })
                            },
                        )
                        .optional()?;
                    Ok(record)
                })
                .await?;

            Ok(record)
        })
    }

    fn dashboard_stats(&self) -> StoreFuture<'_, SupportResult<DashboardStats>> {
        Box::pin(async move {
            let stats = self
                .conn
                .call(|conn| {
                    let total_sessions: i64 =
                        conn.query_row("SELECT COUNT(*) FROM chat_sessions", [], |row| row.get(0))?;
                    let total_messages: i64 =
                        conn.query_row("SELECT COUNT(*) FROM chat_messages", [], |row| row.get(0))?;
                    let emotion_distribution = distribution(conn, "emotion")?;
                    let severity_distribution = distribution(conn, "severity")?;

                    Ok(DashboardStats {
                        total_sessions: to_count(total_sessions),
                        total_messages: to_count(total_messages),
                        emotion_distribution,
                        severity_distribution,
                    })
                })
                .await?;

            Ok(stats)
        })
    }

    fn expire_sessions(
        &self,
        now: DateTime<Utc>,
        timeout: Duration,
        purge_after: Duration,
    ) -> StoreFuture<'_, SupportResult<ExpiryStats>> {
        Box::pin(async move {
            let now_ms = now.timestamp_millis();
            let idle_cutoff = now_ms.saturating_sub(duration_millis(timeout));
            let purge_cutoff = now_ms.saturating_sub(duration_millis(purge_after));

            let stats = self
                .conn
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    let deactivated = tx.execute(
                        "UPDATE chat_sessions SET is_active = 0
                         WHERE is_active = 1 AND last_activity < ?1",
                        rusqlite::params![idle_cutoff],
                    )?;
                    let purged_messages = tx.execute(
                        "DELETE FROM chat_messages WHERE session_id IN (
                            SELECT session_id FROM chat_sessions
                            WHERE is_active = 0 AND last_activity < ?1
                        )",
                        rusqlite::params![purge_cutoff],
                    )?;
                    let purged_sessions = tx.execute(
                        "DELETE FROM chat_sessions WHERE is_active = 0 AND last_activity < ?1",
                        rusqlite::params![purge_cutoff],
                    )?;
                    tx.commit()?;

                    Ok(ExpiryStats {
                        deactivated,
                        purged_messages,
                        purged_sessions,
                    })
                })
                .await?;

            Ok(stats)
        })
    }
}

fn distribution(
    conn: &rusqlite::Connection,
    column: &str,
) -> rusqlite::Result<BTreeMap<String, u64>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {column}, COUNT(*) FROM chat_messages
         WHERE {column} IS NOT NULL
         GROUP BY {column}"
    ))?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, to_count(row.get::<_, i64>(1)?)))
    })?;
    rows.collect()
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
