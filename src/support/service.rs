//! Orchestration of one chat turn: session, classification, reply, storage.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::protocol::{
    ChatHistoryResponse, DashboardStats, SendMessageRequest, SendMessageResponse, Sender,
    SessionStatus, Severity,
};
use crate::support::cleanup::CleanupConfig;
use crate::support::emotion::EmotionClassifier;
use crate::support::errors::{SupportError, SupportResult};
use crate::support::responder::ResponseGenerator;
use crate::support::store::{NewMessage, SessionOpen, SessionStore};

/// Turns loaded as context for classification and follow-up detection.
const HISTORY_WINDOW: usize = 10;

/// Owner recorded when the client did not send a user id.
const ANONYMOUS_USER: &str = "anonymous";

/// Tags stored with every assistant turn.
const AI_EMOTION: &str = "supportive";
const AI_SEVERITY: &str = "low";
const AI_CONFIDENCE: f64 = 0.8;

/// Emotion-support service over a session store.
pub struct SupportService<S> {
    store: Arc<S>,
    classifier: EmotionClassifier,
    responder: ResponseGenerator,
    session_timeout: Duration,
    purge_after: Duration,
    session_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<S: SessionStore> SupportService<S> {
    /// Create the service.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        classifier: EmotionClassifier,
        responder: ResponseGenerator,
        expiry: &CleanupConfig,
    ) -> Self {
        Self {
            store,
            classifier,
            responder,
            session_timeout: expiry.session_timeout,
            purge_after: expiry.purge_after,
            session_locks: DashMap::new(),
        }
    }

    /// Shared handle to the underlying store.
    #[must_use]
    pub fn store(&self) -> Arc<S> {
        Arc::clone(&self.store)
    }

    /// Process one user turn and build the reply body.
    ///
    /// Turns for the same session are handled one at a time.
    ///
    /// # Errors
    /// Returns `InvalidRequest` for a blank message, or a storage error.
    pub async fn handle_message(
        &self,
        request: SendMessageRequest,
    ) -> SupportResult<SendMessageResponse> {
        let message = request.message.trim().to_string();
        if message.is_empty() {
            return Err(SupportError::InvalidRequest(
                "message must not be empty".to_string(),
            ));
        }

        let user_id = if request.user_id.trim().is_empty() {
            ANONYMOUS_USER.to_string()
        } else {
            request.user_id
        };

        let Some(session_id) = request.session_id.filter(|id| !id.trim().is_empty()) else {
            return self.process(user_id, None, message).await;
        };

        let lock = self.session_lock(&session_id);
        let guard = lock.lock().await;
        let result = self
            .process(user_id, Some(session_id.clone()), message)
            .await;
        drop(guard);
        drop(lock);
        self.session_locks
            .remove_if(&session_id, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.session_locks
                .entry(session_id.to_string())
                .or_default()
                .value(),
        )
    }

    async fn process(
        &self,
        user_id: String,
        session_id: Option<String>,
        message: String,
    ) -> SupportResult<SendMessageResponse> {
        let now = Utc::now();

        if let Err(err) = self
            .store
            .expire_sessions(now, self.session_timeout, self.purge_after)
            .await
        {
            warn!(?err, "Lazy session expiry failed");
        }

        let handle = self.store.get_or_create(user_id, session_id, now).await?;
        match handle.open {
            SessionOpen::Created => info!(session_id = %handle.session_id, "Session created"),
            SessionOpen::Reactivated => {
                info!(session_id = %handle.session_id, "Session reactivated after timeout");
            }
            SessionOpen::Resumed => {}
        }

        let history = self
            .store
            .recent_history(handle.session_id.clone(), HISTORY_WINDOW)
            .await?;

        let reading = self.classifier.classify(&message, &history);
        let reply = self.responder.reply(&reading, &history);
        let resources = self.responder.resources(&reading);
        debug!(
            session_id = %handle.session_id,
            emotion = %reading.emotion,
            severity = %reading.severity,
            needs_help = reading.needs_help,
            "Message classified"
        );

        self.store
            .record_message(
                NewMessage {
                    session_id: handle.session_id.clone(),
                    sender: Sender::User,
                    message,
                    emotion: Some(reading.emotion.as_str().to_string()),
                    severity: Some(reading.severity.as_str().to_string()),
                    confidence: Some(reading.confidence),
                },
                now,
            )
            .await?;
        self.store
            .record_message(
                NewMessage {
                    session_id: handle.session_id.clone(),
                    sender: Sender::Ai,
                    message: reply.clone(),
                    emotion: Some(AI_EMOTION.to_string()),
                    severity: Some(AI_SEVERITY.to_string()),
                    confidence: Some(AI_CONFIDENCE),
                },
                now,
            )
            .await?;

        Ok(SendMessageResponse {
            response: reply,
            session_id: handle.session_id,
            emotion: Some(reading.emotion.as_str().to_string()),
            severity: Some(Severity::Label(reading.severity.as_str().to_string())),
            confidence: Some(reading.confidence),
            needs_help: reading.needs_help,
            resources,
        })
    }

    /// Open a fresh session without a first message.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn start_session(&self, user_id: Option<String>) -> SupportResult<String> {
        let user_id = user_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS_USER.to_string());
        let handle = self.store.get_or_create(user_id, None, Utc::now()).await?;
        Ok(handle.session_id)
    }

    /// Stored turns of a session.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn history(&self, session_id: String) -> SupportResult<ChatHistoryResponse> {
        let messages = self.store.history(session_id.clone()).await?;
        Ok(ChatHistoryResponse {
            messages,
            session_id,
        })
    }

    /// Timeout bookkeeping for a session.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn session_status(&self, session_id: String) -> SupportResult<SessionStatus> {
        let Some(record) = self.store.session_record(session_id).await? else {
            return Ok(SessionStatus::not_found());
        };

        let timeout = TimeDelta::from_std(self.session_timeout).unwrap_or(TimeDelta::MAX);
        let remaining = timeout - (Utc::now() - record.last_activity);
        let minutes_left = u64::try_from(remaining.num_minutes()).unwrap_or(0);

        Ok(SessionStatus {
            active: record.is_active && remaining > TimeDelta::zero(),
            last_activity: Some(record.last_activity),
            created_at: Some(record.created_at),
            minutes_until_timeout: Some(minutes_left),
            session_timeout_minutes: Some(self.session_timeout.as_secs() / 60),
            message: None,
        })
    }

    /// Aggregate counters.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn dashboard_stats(&self) -> SupportResult<DashboardStats> {
        self.store.dashboard_stats().await
    }
}
