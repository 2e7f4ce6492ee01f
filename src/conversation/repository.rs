use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::state::ConversationState;
use crate::shared::AppError;

/// Trait for conversation state storage operations
#[async_trait]
pub trait StateRepository: Send + Sync {
    async fn set_state(&self, user_id: i64, state: &ConversationState) -> Result<(), AppError>;

    async fn get_state(&self, user_id: i64) -> Result<Option<ConversationState>, AppError>;

    /// Removes the state; clearing an absent state is not an error
    async fn clear_state(&self, user_id: i64) -> Result<(), AppError>;

    /// All persisted states, for warming the cache at startup
    async fn load_all(&self) -> Result<HashMap<i64, ConversationState>, AppError>;
}

/// In-memory implementation of StateRepository for development and testing
pub struct InMemoryStateRepository {
    states: Mutex<HashMap<i64, ConversationState>>,
}

impl Default for InMemoryStateRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStateRepository {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl StateRepository for InMemoryStateRepository {
    #[instrument(skip(self, state))]
    async fn set_state(&self, user_id: i64, state: &ConversationState) -> Result<(), AppError> {
        debug!(user_id = user_id, "Storing conversation state in memory");

        let mut states = self.states.lock().unwrap();
        states.insert(user_id, state.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_state(&self, user_id: i64) -> Result<Option<ConversationState>, AppError> {
        let states = self.states.lock().unwrap();
        Ok(states.get(&user_id).cloned())
    }

    #[instrument(skip(self))]
    async fn clear_state(&self, user_id: i64) -> Result<(), AppError> {
        let mut states = self.states.lock().unwrap();
        states.remove(&user_id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_all(&self) -> Result<HashMap<i64, ConversationState>, AppError> {
        let states = self.states.lock().unwrap();
        Ok(states.clone())
    }
}

/// PostgreSQL implementation of conversation state storage
pub struct PostgresStateRepository {
    pool: PgPool,
}

impl PostgresStateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateRepository for PostgresStateRepository {
    #[instrument(skip(self, state))]
    async fn set_state(&self, user_id: i64, state: &ConversationState) -> Result<(), AppError> {
        let (tag, payload) = state.to_row()?;
        debug!(user_id = user_id, tag = %tag, "Storing conversation state in database");

        sqlx::query(
            r#"
            INSERT INTO user_states (user_id, state_tag, state_payload)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET state_tag = $2, state_payload = $3
            "#,
        )
        .bind(user_id)
        .bind(&tag)
        .bind(&payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_state(&self, user_id: i64) -> Result<Option<ConversationState>, AppError> {
        let row =
            sqlx::query("SELECT state_tag, state_payload FROM user_states WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => {
                let tag: String = row.try_get("state_tag")?;
                let payload: String = row.try_get("state_payload")?;
                Ok(Some(ConversationState::from_row(&tag, &payload)?))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn clear_state(&self, user_id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_states WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_all(&self) -> Result<HashMap<i64, ConversationState>, AppError> {
        let rows = sqlx::query("SELECT user_id, state_tag, state_payload FROM user_states")
            .fetch_all(&self.pool)
            .await?;

        let mut states = HashMap::with_capacity(rows.len());
        for row in rows {
            let user_id: i64 = row.try_get("user_id")?;
            let tag: String = row.try_get("state_tag")?;
            let payload: String = row.try_get("state_payload")?;
            match ConversationState::from_row(&tag, &payload) {
                Ok(state) => {
                    states.insert(user_id, state);
                }
                Err(err) => {
                    // A malformed row must not keep the process from starting
                    warn!(user_id = user_id, tag = %tag, error = %err, "Skipping unreadable state row");
                }
            }
        }
        Ok(states)
    }
}
