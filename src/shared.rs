use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;

use crate::conversation::repository::StateRepository;
use crate::game::repository::GameRepository;
use crate::player::repository::PlayerRepository;
use crate::settings::SettingsRepository;

/// Shared application state containing all storage dependencies
#[derive(Clone)]
pub struct AppState {
    pub players: Arc<dyn PlayerRepository + Send + Sync>,
    pub games: Arc<dyn GameRepository + Send + Sync>,
    pub states: Arc<dyn StateRepository + Send + Sync>,
    pub settings: Arc<dyn SettingsRepository + Send + Sync>,
}

impl AppState {
    pub fn new(
        players: Arc<dyn PlayerRepository + Send + Sync>,
        games: Arc<dyn GameRepository + Send + Sync>,
        states: Arc<dyn StateRepository + Send + Sync>,
        settings: Arc<dyn SettingsRepository + Send + Sync>,
    ) -> Self {
        Self {
            players,
            games,
            states,
            settings,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

/// Async mutex keyed by entity id.
///
/// Serializes compound read-modify-write sequences per key: the game service
/// locks by game id so two concurrent joins cannot lose an update, and the
/// flow controller locks by user id so conversation state is read and written
/// atomically per user. No ordering is guaranteed across different keys.
pub struct KeyedMutex<K> {
    locks: std::sync::Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
}

impl<K> Default for KeyedMutex<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> KeyedMutex<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Acquires the lock for the given key, creating it on first use.
    pub async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock().unwrap();
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        entry.lock_owned().await
    }
}
