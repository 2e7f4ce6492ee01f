use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument};

use super::models::PlayerModel;
use crate::localization::Language;
use crate::shared::AppError;

/// Trait for player storage operations
#[async_trait]
pub trait PlayerRepository: Send + Sync {
    /// Inserts the player or updates name/handle/language if the id exists
    async fn upsert_player(&self, player: &PlayerModel) -> Result<(), AppError>;

    async fn get_player(&self, user_id: i64) -> Result<Option<PlayerModel>, AppError>;
}

/// In-memory implementation of PlayerRepository for development and testing
pub struct InMemoryPlayerRepository {
    players: Mutex<HashMap<i64, PlayerModel>>,
}

impl Default for InMemoryPlayerRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPlayerRepository {
    pub fn new() -> Self {
        Self {
            players: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl PlayerRepository for InMemoryPlayerRepository {
    #[instrument(skip(self, player))]
    async fn upsert_player(&self, player: &PlayerModel) -> Result<(), AppError> {
        debug!(user_id = player.id, name = %player.name, "Upserting player in memory");

        let mut players = self.players.lock().unwrap();
        players.insert(player.id, player.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_player(&self, user_id: i64) -> Result<Option<PlayerModel>, AppError> {
        let players = self.players.lock().unwrap();
        Ok(players.get(&user_id).cloned())
    }
}

/// PostgreSQL implementation of player storage
pub struct PostgresPlayerRepository {
    pool: PgPool,
}

impl PostgresPlayerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlayerRepository for PostgresPlayerRepository {
    #[instrument(skip(self, player))]
    async fn upsert_player(&self, player: &PlayerModel) -> Result<(), AppError> {
        debug!(user_id = player.id, "Upserting player in database");

        sqlx::query(
            r#"
            INSERT INTO players (id, name, handle, language)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id)
            DO UPDATE SET name = $2, handle = $3, language = $4
            "#,
        )
        .bind(player.id)
        .bind(&player.name)
        .bind(&player.handle)
        .bind(player.language.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_player(&self, user_id: i64) -> Result<Option<PlayerModel>, AppError> {
        let row = sqlx::query("SELECT id, name, handle, language FROM players WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            let language: String = row.try_get("language")?;
            Ok(PlayerModel {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                handle: row.try_get("handle")?,
                language: language.parse().unwrap_or(Language::En),
            })
        })
        .transpose()
        .map_err(|err: sqlx::Error| err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_and_get_player() {
        let repo = InMemoryPlayerRepository::new();
        let player = PlayerModel::new(7, "Alice".to_string(), None, Language::En);

        repo.upsert_player(&player).await.unwrap();

        let fetched = repo.get_player(7).await.unwrap().unwrap();
        assert_eq!(fetched, player);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_mutable_fields() {
        let repo = InMemoryPlayerRepository::new();
        let player = PlayerModel::new(7, "Alice".to_string(), None, Language::En);
        repo.upsert_player(&player).await.unwrap();

        let renamed = PlayerModel::new(
            7,
            "Alisa".to_string(),
            Some("alisa".to_string()),
            Language::Ru,
        );
        repo.upsert_player(&renamed).await.unwrap();

        let fetched = repo.get_player(7).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Alisa");
        assert_eq!(fetched.handle.as_deref(), Some("alisa"));
        assert_eq!(fetched.language, Language::Ru);
    }

    #[tokio::test]
    async fn test_get_unknown_player() {
        let repo = InMemoryPlayerRepository::new();
        assert!(repo.get_player(404).await.unwrap().is_none());
    }
}
