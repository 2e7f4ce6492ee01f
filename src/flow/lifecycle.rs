use tracing::{debug, info, instrument, warn};

use super::controller::FlowController;
use crate::game::service::LaunchResult;
use crate::localization::MessageKey;
use crate::shared::AppError;

/// The launch and finish sequences shared by the creator's start-now button
/// and the date-driven scheduler sweep. Persistence happens inside the game
/// service; this layer owns the fan-out notifications.
impl FlowController {
    /// Starts the game and tells every giver who they drew.
    ///
    /// When fewer than 3 participants joined, the game service has already
    /// torn the game down; everyone who joined is told and any conversation
    /// state targeting the game is cleared. Callers on the manual path must
    /// check the participant count beforehand so this failure branch is only
    /// reachable from the scheduler.
    #[instrument(skip(self))]
    pub async fn launch_game(&self, game_id: &str) -> Result<(), AppError> {
        match self.game_service().launch(game_id).await? {
            LaunchResult::Launched(game) => {
                info!(game_id = %game_id, "Notifying participants of game start");
                for participant in game.participants.values() {
                    let giftee_name = participant
                        .giftee_id
                        .and_then(|giftee_id| game.participant_name(giftee_id))
                        .unwrap_or_default();
                    self.notify(
                        participant.user_id,
                        MessageKey::GameStartedNotice,
                        &[("name", game.name.as_str()), ("giftee", giftee_name)],
                    )
                    .await;
                }
            }
            LaunchResult::Aborted(game) => {
                self.state_cache().clear_for_game(game_id).await?;
                info!(game_id = %game_id, "Notifying participants of aborted game");
                for participant in game.participants.values() {
                    self.notify(
                        participant.user_id,
                        MessageKey::GameAbortedNotice,
                        &[("name", game.name.as_str())],
                    )
                    .await;
                }
            }
            LaunchResult::AlreadyStarted(_) => {
                debug!(game_id = %game_id, "Launch skipped: game already started");
            }
            LaunchResult::GameNotFound => {
                warn!(game_id = %game_id, "Launch skipped: game not found");
            }
        }
        Ok(())
    }

    /// Ends a running game and tells every participant
    #[instrument(skip(self))]
    pub async fn finish_game(&self, game_id: &str) -> Result<(), AppError> {
        let game = match self.game_service().finish(game_id).await? {
            Some(game) => game,
            None => {
                debug!(game_id = %game_id, "Finish skipped: game missing or not running");
                return Ok(());
            }
        };

        info!(game_id = %game_id, "Notifying participants of game end");
        for participant in game.participants.values() {
            self.notify(
                participant.user_id,
                MessageKey::GameFinishedNotice,
                &[("name", game.name.as_str())],
            )
            .await;
        }
        Ok(())
    }
}
