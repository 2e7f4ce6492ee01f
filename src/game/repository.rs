use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{GameModel, GameStatus, Participant};
use crate::shared::AppError;

/// Trait for game storage operations.
///
/// Each call is atomic with respect to the game it touches; compound
/// read-modify-write sequences are serialized per game id by the service.
#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn create_game(&self, game: &GameModel) -> Result<(), AppError>;

    async fn get_game(&self, game_id: &str) -> Result<Option<GameModel>, AppError>;

    async fn find_by_invite_code(&self, code: &str) -> Result<Option<GameModel>, AppError>;

    /// Replaces the stored game, including its participant rows
    async fn update_game(&self, game: &GameModel) -> Result<(), AppError>;

    async fn delete_game(&self, game_id: &str) -> Result<(), AppError>;

    /// All games the user participates in, any status
    async fn games_for_player(&self, user_id: i64) -> Result<Vec<GameModel>, AppError>;

    async fn list_games(&self) -> Result<Vec<GameModel>, AppError>;
}

/// In-memory implementation of GameRepository for development and testing
pub struct InMemoryGameRepository {
    games: Mutex<HashMap<String, GameModel>>,
}

impl Default for InMemoryGameRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self {
            games: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    #[instrument(skip(self, game))]
    async fn create_game(&self, game: &GameModel) -> Result<(), AppError> {
        debug!(game_id = %game.id, name = %game.name, "Creating game in memory");

        let mut games = self.games.lock().unwrap();
        if games.contains_key(&game.id) {
            warn!(game_id = %game.id, "Game already exists in memory");
            return Err(AppError::DatabaseError("Game already exists".to_string()));
        }
        games.insert(game.id.clone(), game.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_game(&self, game_id: &str) -> Result<Option<GameModel>, AppError> {
        let games = self.games.lock().unwrap();
        Ok(games.get(game_id).cloned())
    }

    #[instrument(skip(self))]
    async fn find_by_invite_code(&self, code: &str) -> Result<Option<GameModel>, AppError> {
        let games = self.games.lock().unwrap();
        Ok(games
            .values()
            .find(|g| g.invite_code.as_deref() == Some(code))
            .cloned())
    }

    #[instrument(skip(self, game))]
    async fn update_game(&self, game: &GameModel) -> Result<(), AppError> {
        debug!(game_id = %game.id, status = %game.status, "Updating game in memory");

        let mut games = self.games.lock().unwrap();
        if !games.contains_key(&game.id) {
            return Err(AppError::NotFound("Game not found".to_string()));
        }
        games.insert(game.id.clone(), game.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_game(&self, game_id: &str) -> Result<(), AppError> {
        debug!(game_id = %game_id, "Deleting game from memory");

        let mut games = self.games.lock().unwrap();
        if games.remove(game_id).is_none() {
            return Err(AppError::NotFound("Game not found".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn games_for_player(&self, user_id: i64) -> Result<Vec<GameModel>, AppError> {
        let games = self.games.lock().unwrap();
        Ok(games
            .values()
            .filter(|g| g.has_participant(user_id))
            .cloned()
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_games(&self) -> Result<Vec<GameModel>, AppError> {
        let games = self.games.lock().unwrap();
        Ok(games.values().cloned().collect())
    }
}

/// PostgreSQL implementation of game storage
pub struct PostgresGameRepository {
    pool: PgPool,
}

impl PostgresGameRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_game_row(row: &PgRow) -> Result<GameModel, AppError> {
        let status: String = row.try_get("status").map_err(AppError::from)?;
        let status: GameStatus = status
            .parse()
            .map_err(|_| AppError::DatabaseError(format!("unknown game status: {}", status)))?;

        Ok(GameModel {
            id: row.try_get("id").map_err(AppError::from)?,
            name: row.try_get("name").map_err(AppError::from)?,
            invite_code: row.try_get("invite_code").map_err(AppError::from)?,
            creator_id: row.try_get("creator_id").map_err(AppError::from)?,
            status,
            participants: HashMap::new(),
            start_date: row.try_get("start_date").map_err(AppError::from)?,
            end_date: row.try_get("end_date").map_err(AppError::from)?,
        })
    }

    async fn load_participants(&self, game: &mut GameModel) -> Result<(), AppError> {
        let rows = sqlx::query(
            "SELECT user_id, name, wishlist, giftee_id FROM game_participants WHERE game_id = $1",
        )
        .bind(&game.id)
        .fetch_all(&self.pool)
        .await?;

        for row in rows {
            let participant = Participant {
                user_id: row.try_get("user_id")?,
                name: row.try_get("name")?,
                wishlist: row.try_get("wishlist")?,
                giftee_id: row.try_get("giftee_id")?,
            };
            game.participants.insert(participant.user_id, participant);
        }
        Ok(())
    }

    async fn fetch_game(&self, row: Option<PgRow>) -> Result<Option<GameModel>, AppError> {
        match row {
            Some(row) => {
                let mut game = Self::map_game_row(&row)?;
                self.load_participants(&mut game).await?;
                Ok(Some(game))
            }
            None => Ok(None),
        }
    }
}

const SELECT_GAME: &str =
    "SELECT id, name, invite_code, creator_id, status, start_date, end_date FROM games";

#[async_trait]
impl GameRepository for PostgresGameRepository {
    #[instrument(skip(self, game))]
    async fn create_game(&self, game: &GameModel) -> Result<(), AppError> {
        debug!(game_id = %game.id, "Creating game in database");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO games (id, name, invite_code, creator_id, status, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&game.id)
        .bind(&game.name)
        .bind(&game.invite_code)
        .bind(game.creator_id)
        .bind(game.status.to_string())
        .bind(game.start_date)
        .bind(game.end_date)
        .execute(&mut *tx)
        .await?;

        for participant in game.participants.values() {
            sqlx::query(
                r#"
                INSERT INTO game_participants (game_id, user_id, name, wishlist, giftee_id)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&game.id)
            .bind(participant.user_id)
            .bind(&participant.name)
            .bind(&participant.wishlist)
            .bind(participant.giftee_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_game(&self, game_id: &str) -> Result<Option<GameModel>, AppError> {
        let row = sqlx::query(&format!("{} WHERE id = $1", SELECT_GAME))
            .bind(game_id)
            .fetch_optional(&self.pool)
            .await?;
        self.fetch_game(row).await
    }

    #[instrument(skip(self))]
    async fn find_by_invite_code(&self, code: &str) -> Result<Option<GameModel>, AppError> {
        let row = sqlx::query(&format!("{} WHERE invite_code = $1", SELECT_GAME))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        self.fetch_game(row).await
    }

    #[instrument(skip(self, game))]
    async fn update_game(&self, game: &GameModel) -> Result<(), AppError> {
        debug!(game_id = %game.id, status = %game.status, "Updating game in database");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE games
            SET name = $2, invite_code = $3, status = $4, start_date = $5, end_date = $6
            WHERE id = $1
            "#,
        )
        .bind(&game.id)
        .bind(&game.name)
        .bind(&game.invite_code)
        .bind(game.status.to_string())
        .bind(game.start_date)
        .bind(game.end_date)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Game not found".to_string()));
        }

        // Participant rows are replaced wholesale; the transaction keeps the
        // game and its rows consistent
        sqlx::query("DELETE FROM game_participants WHERE game_id = $1")
            .bind(&game.id)
            .execute(&mut *tx)
            .await?;

        for participant in game.participants.values() {
            sqlx::query(
                r#"
                INSERT INTO game_participants (game_id, user_id, name, wishlist, giftee_id)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&game.id)
            .bind(participant.user_id)
            .bind(&participant.name)
            .bind(&participant.wishlist)
            .bind(participant.giftee_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_game(&self, game_id: &str) -> Result<(), AppError> {
        debug!(game_id = %game_id, "Deleting game from database");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM game_participants WHERE game_id = $1")
            .bind(game_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM games WHERE id = $1")
            .bind(game_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Game not found".to_string()));
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn games_for_player(&self, user_id: i64) -> Result<Vec<GameModel>, AppError> {
        let rows = sqlx::query(&format!(
            "{} WHERE id IN (SELECT game_id FROM game_participants WHERE user_id = $1)",
            SELECT_GAME
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut games = Vec::with_capacity(rows.len());
        for row in rows {
            let mut game = Self::map_game_row(&row)?;
            self.load_participants(&mut game).await?;
            games.push(game);
        }
        Ok(games)
    }

    #[instrument(skip(self))]
    async fn list_games(&self) -> Result<Vec<GameModel>, AppError> {
        let rows = sqlx::query(SELECT_GAME).fetch_all(&self.pool).await?;

        let mut games = Vec::with_capacity(rows.len());
        for row in rows {
            let mut game = Self::map_game_row(&row)?;
            self.load_participants(&mut game).await?;
            games.push(game);
        }
        Ok(games)
    }
}
