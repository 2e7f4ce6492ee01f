use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use super::repository::StateRepository;
use super::state::ConversationState;
use crate::shared::AppError;

/// Write-through cache of active conversation states.
///
/// Holds the states of every user currently mid-flow. Loaded from the
/// repository at startup and written through on every mutation, so an
/// outbound prompt is never ahead of what storage knows. `flush` exists as
/// the shutdown boundary; with write-through it only re-persists the cache.
pub struct StateCache {
    repository: Arc<dyn StateRepository + Send + Sync>,
    states: RwLock<HashMap<i64, ConversationState>>,
}

impl StateCache {
    pub fn new(repository: Arc<dyn StateRepository + Send + Sync>) -> Self {
        Self {
            repository,
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Warms the cache from storage. Called once at startup.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<(), AppError> {
        let stored = self.repository.load_all().await?;
        let count = stored.len();

        let mut states = self.states.write().await;
        *states = stored;

        info!(active_states = count, "Conversation states loaded");
        Ok(())
    }

    pub async fn get(&self, user_id: i64) -> Option<ConversationState> {
        self.states.read().await.get(&user_id).cloned()
    }

    pub async fn set(&self, user_id: i64, state: ConversationState) -> Result<(), AppError> {
        self.repository.set_state(user_id, &state).await?;
        self.states.write().await.insert(user_id, state);
        Ok(())
    }

    pub async fn clear(&self, user_id: i64) -> Result<(), AppError> {
        self.repository.clear_state(user_id).await?;
        self.states.write().await.remove(&user_id);
        Ok(())
    }

    /// Clears every state targeting the given game. Used when a game is
    /// deleted so nobody is left answering prompts for it.
    #[instrument(skip(self))]
    pub async fn clear_for_game(&self, game_id: &str) -> Result<Vec<i64>, AppError> {
        let affected: Vec<i64> = {
            let states = self.states.read().await;
            states
                .iter()
                .filter(|(_, state)| state.game_id() == Some(game_id))
                .map(|(user_id, _)| *user_id)
                .collect()
        };

        for user_id in &affected {
            self.clear(*user_id).await?;
        }
        Ok(affected)
    }

    /// Re-persists every cached state. Called at shutdown.
    #[instrument(skip(self))]
    pub async fn flush(&self) -> Result<(), AppError> {
        let states = self.states.read().await;
        for (user_id, state) in states.iter() {
            self.repository.set_state(*user_id, state).await?;
        }
        info!(active_states = states.len(), "Conversation states flushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::repository::InMemoryStateRepository;
    use crate::conversation::state::PostLanguageAction;

    fn cache_with_repo() -> (Arc<InMemoryStateRepository>, StateCache) {
        let repo = Arc::new(InMemoryStateRepository::new());
        (repo.clone(), StateCache::new(repo))
    }

    #[tokio::test]
    async fn test_set_writes_through() {
        let (repo, cache) = cache_with_repo();
        let state = ConversationState::AwaitingGameName;

        cache.set(1, state.clone()).await.unwrap();

        assert_eq!(cache.get(1).await, Some(state.clone()));
        // The repository must already know about it
        assert_eq!(repo.get_state(1).await.unwrap(), Some(state));
    }

    #[tokio::test]
    async fn test_load_warms_from_repository() {
        let (repo, cache) = cache_with_repo();
        repo.set_state(9, &ConversationState::AwaitingGameName)
            .await
            .unwrap();

        cache.load().await.unwrap();

        assert_eq!(cache.get(9).await, Some(ConversationState::AwaitingGameName));
    }

    #[tokio::test]
    async fn test_clear_for_game_only_touches_that_game() {
        let (repo, cache) = cache_with_repo();
        cache
            .set(
                1,
                ConversationState::AwaitingWishlist {
                    game_id: "g-1".to_string(),
                    is_creator: false,
                },
            )
            .await
            .unwrap();
        cache
            .set(
                2,
                ConversationState::AwaitingLanguage {
                    then: PostLanguageAction::JoinGame {
                        game_id: "g-1".to_string(),
                    },
                },
            )
            .await
            .unwrap();
        cache
            .set(
                3,
                ConversationState::AwaitingStartDate {
                    game_id: "g-2".to_string(),
                },
            )
            .await
            .unwrap();

        let mut affected = cache.clear_for_game("g-1").await.unwrap();
        affected.sort_unstable();

        assert_eq!(affected, vec![1, 2]);
        assert!(cache.get(1).await.is_none());
        assert!(cache.get(2).await.is_none());
        assert!(cache.get(3).await.is_some());
        assert!(repo.get_state(1).await.unwrap().is_none());
    }
}
