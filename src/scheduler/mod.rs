use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};

use crate::flow::FlowController;
use crate::game::models::GameStatus;
use crate::game::repository::GameRepository;
use crate::shared::AppError;

/// Configuration for the lifecycle sweep task
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often to check games against the calendar
    pub sweep_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(5),
        }
    }
}

/// What one sweep did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub started: usize,
    pub finished: usize,
}

/// Starts the background task that auto-starts and auto-ends games by date.
///
/// This is the only path that changes a game's status based on the
/// wall-clock date; the creator's start-now button is the only other way
/// into InProgress.
#[instrument(skip(controller, games))]
pub async fn start_lifecycle_task(
    controller: Arc<FlowController>,
    games: Arc<dyn GameRepository + Send + Sync>,
    config: SchedulerConfig,
) {
    info!(
        sweep_interval_secs = config.sweep_interval.as_secs(),
        "Starting lifecycle sweep background task"
    );

    let mut sweep_interval = interval(config.sweep_interval);

    loop {
        sweep_interval.tick().await;

        match sweep_games(&controller, &games).await {
            Ok(outcome) if outcome.started > 0 || outcome.finished > 0 => {
                info!(
                    started = outcome.started,
                    finished = outcome.finished,
                    "Lifecycle sweep completed"
                );
            }
            Ok(_) => debug!("Lifecycle sweep found nothing due"),
            Err(err) => error!(error = %err, "Lifecycle sweep failed"),
        }
    }
}

/// Runs one sweep against the current UTC calendar day
pub async fn sweep_games(
    controller: &Arc<FlowController>,
    games: &Arc<dyn GameRepository + Send + Sync>,
) -> Result<SweepOutcome, AppError> {
    sweep_games_on(controller, games, Utc::now().date_naive()).await
}

/// Runs one sweep as of the given day: recruiting games starting today are
/// launched (or torn down when understaffed), running games ending today are
/// finished. A failure on one game is logged and does not stop the sweep.
#[instrument(skip(controller, games))]
pub async fn sweep_games_on(
    controller: &Arc<FlowController>,
    games: &Arc<dyn GameRepository + Send + Sync>,
    today: NaiveDate,
) -> Result<SweepOutcome, AppError> {
    let mut outcome = SweepOutcome::default();

    for game in games.list_games().await? {
        match game.status {
            GameStatus::Recruiting if game.start_date == Some(today) => {
                match controller.launch_game(&game.id).await {
                    Ok(()) => outcome.started += 1,
                    Err(err) => {
                        warn!(game_id = %game.id, error = %err, "Scheduled start failed")
                    }
                }
            }
            GameStatus::InProgress if game.end_date == Some(today) => {
                match controller.finish_game(&game.id).await {
                    Ok(()) => outcome.finished += 1,
                    Err(err) => {
                        warn!(game_id = %game.id, error = %err, "Scheduled finish failed")
                    }
                }
            }
            _ => {}
        }
    }

    Ok(outcome)
}
