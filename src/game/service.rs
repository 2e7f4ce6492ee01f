use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::models::{DateError, GameModel, GameStatus, StartOutcome};
use super::repository::GameRepository;
use crate::shared::{AppError, KeyedMutex};

/// Result of attempting to add a participant
#[derive(Debug, Clone)]
pub enum AddParticipantResult {
    /// Participant added (or its name refreshed), returns updated game
    Added(GameModel),
    /// The game no longer accepts participants
    NotJoinable(GameStatus),
    GameNotFound,
}

/// Result of attempting to leave a game
#[derive(Debug, Clone)]
pub enum LeaveGameResult {
    Left(GameModel),
    NotParticipant,
    GameNotFound,
}

/// Result of submitting a start or end date
#[derive(Debug, Clone)]
pub enum SetDateOutcome {
    Updated(GameModel),
    Rejected(DateError),
    GameNotFound,
}

/// Result of a wishlist mutation
#[derive(Debug, Clone)]
pub enum WishlistOutcome {
    Updated(GameModel),
    TooLong,
    NotParticipant,
    GameNotFound,
}

/// Result of attempting to start a game
#[derive(Debug, Clone)]
pub enum LaunchResult {
    /// Pairings drawn; snapshot has status InProgress
    Launched(GameModel),
    /// Fewer than 3 participants: the game was torn down. The snapshot
    /// carries the final participant list for notifications.
    Aborted(GameModel),
    /// Someone else already moved the game past recruiting
    AlreadyStarted(GameModel),
    GameNotFound,
}

/// Service for game lifecycle business logic.
///
/// All compound read-modify-write sequences run under a per-game-id mutex so
/// two users touching the same game concurrently cannot lose updates.
pub struct GameService {
    repository: Arc<dyn GameRepository + Send + Sync>,
    locks: KeyedMutex<String>,
}

impl GameService {
    pub fn new(repository: Arc<dyn GameRepository + Send + Sync>) -> Self {
        Self {
            repository,
            locks: KeyedMutex::new(),
        }
    }

    /// Creates a new game in the Creating status
    #[instrument(skip(self))]
    pub async fn create_game(&self, name: String, creator_id: i64) -> Result<GameModel, AppError> {
        let game = GameModel::new(name, creator_id);
        self.repository.create_game(&game).await?;

        info!(game_id = %game.id, creator_id = creator_id, "Game created");
        Ok(game)
    }

    #[instrument(skip(self))]
    pub async fn get_game(&self, game_id: &str) -> Result<Option<GameModel>, AppError> {
        self.repository.get_game(game_id).await
    }

    #[instrument(skip(self))]
    pub async fn find_by_invite_code(&self, code: &str) -> Result<Option<GameModel>, AppError> {
        self.repository.find_by_invite_code(code).await
    }

    #[instrument(skip(self))]
    pub async fn games_for_player(&self, user_id: i64) -> Result<Vec<GameModel>, AppError> {
        self.repository.games_for_player(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn set_start_date(
        &self,
        game_id: &str,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<SetDateOutcome, AppError> {
        let _guard = self.locks.lock(&game_id.to_string()).await;

        let mut game = match self.repository.get_game(game_id).await? {
            Some(game) => game,
            None => return Ok(SetDateOutcome::GameNotFound),
        };

        if let Err(reason) = game.set_start_date(date, today) {
            debug!(game_id = %game_id, %reason, "Start date rejected");
            return Ok(SetDateOutcome::Rejected(reason));
        }
        self.repository.update_game(&game).await?;
        Ok(SetDateOutcome::Updated(game))
    }

    #[instrument(skip(self))]
    pub async fn set_end_date(
        &self,
        game_id: &str,
        date: NaiveDate,
    ) -> Result<SetDateOutcome, AppError> {
        let _guard = self.locks.lock(&game_id.to_string()).await;

        let mut game = match self.repository.get_game(game_id).await? {
            Some(game) => game,
            None => return Ok(SetDateOutcome::GameNotFound),
        };

        if let Err(reason) = game.set_end_date(date) {
            debug!(game_id = %game_id, %reason, "End date rejected");
            return Ok(SetDateOutcome::Rejected(reason));
        }
        self.repository.update_game(&game).await?;
        Ok(SetDateOutcome::Updated(game))
    }

    /// Adds a participant (idempotent by user id) while the game still
    /// accepts members, i.e. before it starts
    #[instrument(skip(self, name))]
    pub async fn add_participant(
        &self,
        game_id: &str,
        user_id: i64,
        name: String,
    ) -> Result<AddParticipantResult, AppError> {
        let _guard = self.locks.lock(&game_id.to_string()).await;

        let mut game = match self.repository.get_game(game_id).await? {
            Some(game) => game,
            None => return Ok(AddParticipantResult::GameNotFound),
        };

        if game.status >= GameStatus::InProgress {
            debug!(game_id = %game_id, status = %game.status, "Game no longer joinable");
            return Ok(AddParticipantResult::NotJoinable(game.status));
        }

        game.add_participant(user_id, name);
        self.repository.update_game(&game).await?;

        info!(
            game_id = %game_id,
            user_id = user_id,
            participant_count = game.participant_count(),
            "Participant added"
        );
        Ok(AddParticipantResult::Added(game))
    }

    /// Removes a participant together with their wishlist
    #[instrument(skip(self))]
    pub async fn leave(&self, game_id: &str, user_id: i64) -> Result<LeaveGameResult, AppError> {
        let _guard = self.locks.lock(&game_id.to_string()).await;

        let mut game = match self.repository.get_game(game_id).await? {
            Some(game) => game,
            None => return Ok(LeaveGameResult::GameNotFound),
        };

        if !game.remove_participant(user_id) {
            return Ok(LeaveGameResult::NotParticipant);
        }
        self.repository.update_game(&game).await?;

        info!(game_id = %game_id, user_id = user_id, "Participant left");
        Ok(LeaveGameResult::Left(game))
    }

    /// Deletes the game, returning a snapshot for notifications
    #[instrument(skip(self))]
    pub async fn delete(&self, game_id: &str) -> Result<Option<GameModel>, AppError> {
        let _guard = self.locks.lock(&game_id.to_string()).await;

        let game = match self.repository.get_game(game_id).await? {
            Some(game) => game,
            None => return Ok(None),
        };
        self.repository.delete_game(game_id).await?;

        info!(game_id = %game_id, "Game deleted");
        Ok(Some(game))
    }

    /// Issues a fresh unique invite code and moves the game to Recruiting
    #[instrument(skip(self))]
    pub async fn open_recruiting(&self, game_id: &str) -> Result<Option<GameModel>, AppError> {
        let _guard = self.locks.lock(&game_id.to_string()).await;

        let mut game = match self.repository.get_game(game_id).await? {
            Some(game) => game,
            None => return Ok(None),
        };

        let code = self.generate_invite_code().await?;
        game.open_recruiting(code)
            .map_err(|err| AppError::Internal(err.to_string()))?;
        self.repository.update_game(&game).await?;

        info!(
            game_id = %game_id,
            invite_code = %game.invite_code.as_deref().unwrap_or_default(),
            "Game recruiting"
        );
        Ok(Some(game))
    }

    /// Attempts to start the game: draws pairings when at least 3
    /// participants joined, otherwise tears the game down.
    ///
    /// The caller is responsible for notifications; for the manual start-now
    /// path the <3 precondition must be checked before calling so no
    /// transition happens there.
    #[instrument(skip(self))]
    pub async fn launch(&self, game_id: &str) -> Result<LaunchResult, AppError> {
        let _guard = self.locks.lock(&game_id.to_string()).await;

        let mut game = match self.repository.get_game(game_id).await? {
            Some(game) => game,
            None => return Ok(LaunchResult::GameNotFound),
        };

        if game.status >= GameStatus::InProgress {
            debug!(game_id = %game_id, status = %game.status, "Game already past recruiting");
            return Ok(LaunchResult::AlreadyStarted(game));
        }

        match game.start() {
            Ok(StartOutcome::Launched) => {
                self.repository.update_game(&game).await?;
                info!(
                    game_id = %game_id,
                    participant_count = game.participant_count(),
                    "Game launched"
                );
                Ok(LaunchResult::Launched(game))
            }
            Ok(StartOutcome::Aborted) => {
                self.repository.delete_game(game_id).await?;
                warn!(
                    game_id = %game_id,
                    participant_count = game.participant_count(),
                    "Game aborted: not enough participants"
                );
                Ok(LaunchResult::Aborted(game))
            }
            Err(err) => Err(AppError::Internal(err.to_string())),
        }
    }

    /// Ends a running game. Returns None when the game is missing or not
    /// in progress.
    #[instrument(skip(self))]
    pub async fn finish(&self, game_id: &str) -> Result<Option<GameModel>, AppError> {
        let _guard = self.locks.lock(&game_id.to_string()).await;

        let mut game = match self.repository.get_game(game_id).await? {
            Some(game) => game,
            None => return Ok(None),
        };

        if game.finish().is_err() {
            warn!(game_id = %game_id, status = %game.status, "Finish skipped");
            return Ok(None);
        }
        self.repository.update_game(&game).await?;

        info!(game_id = %game_id, "Game finished");
        Ok(Some(game))
    }

    #[instrument(skip(self))]
    pub async fn append_wishlist_line(
        &self,
        game_id: &str,
        user_id: i64,
        line: &str,
    ) -> Result<WishlistOutcome, AppError> {
        let _guard = self.locks.lock(&game_id.to_string()).await;

        let mut game = match self.repository.get_game(game_id).await? {
            Some(game) => game,
            None => return Ok(WishlistOutcome::GameNotFound),
        };

        match game.append_wishlist_line(user_id, line) {
            Ok(()) => {
                self.repository.update_game(&game).await?;
                Ok(WishlistOutcome::Updated(game))
            }
            Err(super::models::GameError::WishlistTooLong) => Ok(WishlistOutcome::TooLong),
            Err(_) => Ok(WishlistOutcome::NotParticipant),
        }
    }

    #[instrument(skip(self))]
    pub async fn clear_wishlist(
        &self,
        game_id: &str,
        user_id: i64,
    ) -> Result<WishlistOutcome, AppError> {
        let _guard = self.locks.lock(&game_id.to_string()).await;

        let mut game = match self.repository.get_game(game_id).await? {
            Some(game) => game,
            None => return Ok(WishlistOutcome::GameNotFound),
        };

        match game.clear_wishlist(user_id) {
            Ok(()) => {
                self.repository.update_game(&game).await?;
                Ok(WishlistOutcome::Updated(game))
            }
            Err(_) => Ok(WishlistOutcome::NotParticipant),
        }
    }

    /// Generates an invite code that no existing game uses
    async fn generate_invite_code(&self) -> Result<String, AppError> {
        for _ in 0..10 {
            let code = petname::Petnames::default().generate_one(2, "-");
            if self.repository.find_by_invite_code(&code).await?.is_none() {
                return Ok(code);
            }
        }
        // Collisions ten times in a row means the petname space is crowded;
        // fall back to an opaque unique code
        Ok(Uuid::new_v4().to_string())
    }
}
