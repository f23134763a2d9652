//! Background worker expiring idle chat sessions.
//!
//! Periodically marks sessions inactive once they pass the inactivity timeout
//! and purges sessions (with their turns) that stayed inactive past the purge
//! horizon.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::support::errors::SupportResult;
use crate::support::store::{ExpiryStats, SessionStore};

/// Configuration for session expiry.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Interval between cleanup runs.
    pub interval: Duration,
    /// Idle time after which a session becomes inactive.
    pub session_timeout: Duration,
    /// Inactive time after which a session is deleted.
    pub purge_after: Duration,
    /// Whether the background worker runs at all.
    pub enabled: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for CleanupConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.cleanup_interval_seconds),
            session_timeout: config.session_timeout(),
            purge_after: config.purge_after(),
            enabled: true,
        }
    }
}

/// Background session expiry worker.
pub struct SessionCleanup<S> {
    store: Arc<S>,
    config: CleanupConfig,
    shutdown: Arc<Notify>,
}

impl<S: SessionStore + 'static> SessionCleanup<S> {
    /// Create a new cleanup worker.
    #[must_use]
    pub fn new(store: Arc<S>, config: CleanupConfig) -> Self {
        Self {
            store,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a shutdown notifier to stop the worker.
    #[must_use]
    pub fn shutdown_notifier(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Spawn the worker as a tokio task.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        if !self.config.enabled {
            info!("Session cleanup is disabled");
            return;
        }

        let interval = self.config.interval;
        info!(?interval, "Starting session cleanup worker");

        loop {
            tokio::select! {
                () = tokio::time::sleep(interval) => {
                    match self.run_once().await {
                        Ok(stats) if stats != ExpiryStats::default() => {
                            info!(
                                deactivated = stats.deactivated,
                                purged_sessions = stats.purged_sessions,
                                purged_messages = stats.purged_messages,
                                "Session cleanup completed"
                            );
                        }
                        Ok(_) => debug!("Session cleanup found nothing to expire"),
                        Err(err) => warn!(?err, "Session cleanup failed"),
                    }
                }
                () = self.shutdown.notified() => {
                    info!("Session cleanup worker shutting down");
                    break;
                }
            }
        }
    }

    /// Run a single expiry pass now.
    ///
    /// # Errors
    /// Returns an error if store operations fail.
    pub async fn run_once(&self) -> SupportResult<ExpiryStats> {
        self.store
            .expire_sessions(Utc::now(), self.config.session_timeout, self.config.purge_after)
            .await
    }
}
