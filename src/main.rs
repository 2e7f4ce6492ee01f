use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use santabot::conversation::repository::InMemoryStateRepository;
use santabot::conversation::StateCache;
use santabot::flow::FlowController;
use santabot::game::repository::InMemoryGameRepository;
use santabot::localization::StaticLocalizer;
use santabot::messenger::LoggingMessenger;
use santabot::player::repository::InMemoryPlayerRepository;
use santabot::scheduler::{start_lifecycle_task, SchedulerConfig};
use santabot::settings::{keys, InMemorySettingsRepository, SettingsRepository};
use santabot::shared::AppState;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "santabot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    info!("Starting Secret Santa bot core");

    // In-memory storage for development.
    // For production with PostgreSQL:
    // let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    // let pool = sqlx::PgPool::connect(&database_url).await.expect("Failed to connect to database");
    // let players = Arc::new(PostgresPlayerRepository::new(pool.clone()));
    // let games = Arc::new(PostgresGameRepository::new(pool.clone()));
    // let states = Arc::new(PostgresStateRepository::new(pool.clone()));
    // let settings = Arc::new(PostgresSettingsRepository::new(pool));
    let app = AppState::new(
        Arc::new(InMemoryPlayerRepository::new()),
        Arc::new(InMemoryGameRepository::new()),
        Arc::new(InMemoryStateRepository::new()),
        Arc::new(InMemorySettingsRepository::new()),
    );

    // Transport credentials live in the settings area, seeded from the
    // environment on first boot
    if let Ok(token) = std::env::var("BOT_TOKEN") {
        app.settings
            .set_setting(keys::BOT_TOKEN, &token)
            .await
            .expect("Failed to store bot token");
    }
    if let Ok(username) = std::env::var("BOT_USERNAME") {
        app.settings
            .set_setting(keys::BOT_USERNAME, &username)
            .await
            .expect("Failed to store bot username");
    }
    let bot_username = app
        .settings
        .get_setting(keys::BOT_USERNAME)
        .await
        .expect("Failed to read bot username")
        .unwrap_or_else(|| "santa_bot".to_string());

    // Warm the conversation state cache so flows survive restarts
    let states = Arc::new(StateCache::new(app.states.clone()));
    states.load().await.expect("Failed to load conversation states");

    let controller = Arc::new(FlowController::new(
        app.clone(),
        Arc::new(LoggingMessenger),
        Arc::new(StaticLocalizer),
        states.clone(),
        bot_username,
    ));

    tokio::spawn(start_lifecycle_task(
        controller.clone(),
        app.games.clone(),
        SchedulerConfig::default(),
    ));

    info!("Core ready; feed transport events into FlowController");

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");

    states.flush().await.expect("Failed to flush conversation states");
    info!("Shut down cleanly");
}
