//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::support::{
    CleanupConfig, EmotionClassifier, ResponseGenerator, SqliteSessionStore, SupportResult, SupportService,
};

/// Shared application state.
pub struct AppState {
    /// Emotion-support service answering chat turns.
    pub support: SupportService<SqliteSessionStore>,
    /// Settings the server was started with.
    pub config: ServerConfig,
}

impl AppState {
    /// Open the configured database and build the service.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or the classifier
    /// patterns fail to compile.
    pub async fn new(config: ServerConfig) -> SupportResult<Arc<Self>> {
        let store = SqliteSessionStore::open(&config.sqlite_path).await?;
        tracing::info!(path = %config.sqlite_path.display(), "Session store opened");
        Self::with_store(store, config)
    }

    /// Build the state over a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if the in-memory database cannot be initialised.
    pub async fn in_memory(config: ServerConfig) -> SupportResult<Arc<Self>> {
        let store = SqliteSessionStore::open_in_memory().await?;
        Self::with_store(store, config)
    }

    fn with_store(store: SqliteSessionStore, config: ServerConfig) -> SupportResult<Arc<Self>> {
        let classifier = EmotionClassifier::new()?;
        let support = SupportService::new(
            Arc::new(store),
            classifier,
            ResponseGenerator::new(),
            &CleanupConfig::from(&config),
        );

        Ok(Arc::new(Self { support, config }))
    }
}
