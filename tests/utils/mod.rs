use chrono::Utc;
use std::sync::Arc;

use santabot::conversation::repository::InMemoryStateRepository;
use santabot::conversation::{ConversationState, StateCache};
use santabot::flow::{CallbackEvent, FlowController, TextMessageEvent};
use santabot::game::models::GameModel;
use santabot::game::repository::{GameRepository, InMemoryGameRepository};
use santabot::localization::StaticLocalizer;
use santabot::messenger::RecordingMessenger;
use santabot::player::repository::InMemoryPlayerRepository;
use santabot::settings::InMemorySettingsRepository;
use santabot::shared::AppState;

// ============================================================================
// Test harness wiring the controller over in-memory storage
// ============================================================================

pub struct TestHarness {
    pub controller: Arc<FlowController>,
    pub messenger: RecordingMessenger,
    pub games: Arc<InMemoryGameRepository>,
    pub states: Arc<StateCache>,
}

pub fn setup() -> TestHarness {
    let games = Arc::new(InMemoryGameRepository::new());
    let state_repo = Arc::new(InMemoryStateRepository::new());
    let app = AppState::new(
        Arc::new(InMemoryPlayerRepository::new()),
        games.clone(),
        state_repo.clone(),
        Arc::new(InMemorySettingsRepository::new()),
    );

    let messenger = RecordingMessenger::new();
    let states = Arc::new(StateCache::new(state_repo));
    let controller = Arc::new(FlowController::new(
        app,
        Arc::new(messenger.clone()),
        Arc::new(StaticLocalizer),
        states.clone(),
        "santa_bot".to_string(),
    ));

    TestHarness {
        controller,
        messenger,
        games,
        states,
    }
}

impl TestHarness {
    /// Delivers a plain text message from the given user
    pub async fn text(&self, user_id: i64, text: &str) {
        self.controller
            .handle_text(TextMessageEvent {
                sender_id: user_id,
                sender_name: format!("User {}", user_id),
                sender_handle: None,
                sender_locale: Some("en".to_string()),
                text: text.to_string(),
            })
            .await
            .expect("handle_text failed");
    }

    /// Delivers a button press from the given user
    pub async fn callback(&self, user_id: i64, data: &str) {
        self.controller
            .handle_callback(CallbackEvent {
                sender_id: user_id,
                callback_id: format!("cb-{}", user_id),
                data: data.to_string(),
                originating_message_id: None,
            })
            .await
            .expect("handle_callback failed");
    }

    pub async fn last_text(&self, user_id: i64) -> String {
        self.messenger
            .last_text_for(user_id)
            .await
            .unwrap_or_else(|| panic!("no messages sent to user {}", user_id))
    }

    pub async fn state_of(&self, user_id: i64) -> Option<ConversationState> {
        self.states.get(user_id).await
    }

    /// The only stored game; panics unless exactly one exists
    pub async fn only_game(&self) -> GameModel {
        let games = self.games.list_games().await.unwrap();
        assert_eq!(games.len(), 1, "expected exactly one game");
        games.into_iter().next().unwrap()
    }

    /// Runs the creator flow end to end: menu, name, dates, player name,
    /// one wishlist line, done. Returns the recruiting game.
    pub async fn create_game_flow(
        &self,
        creator: i64,
        game_name: &str,
        player_name: &str,
        wishlist_line: &str,
    ) -> GameModel {
        self.text(creator, "/start").await;
        self.text(creator, "Create a game").await;
        self.text(creator, game_name).await;
        self.text(creator, &date_in_days(1)).await;
        self.text(creator, &date_in_days(7)).await;
        self.text(creator, player_name).await;
        self.text(creator, wishlist_line).await;
        self.text(creator, "Done").await;

        let games = self.games.list_games().await.unwrap();
        games
            .into_iter()
            .find(|g| g.creator_id == creator)
            .expect("creator flow did not produce a game")
    }

    /// Runs the join flow end to end for an invite code. First-contact
    /// users get the language prompt before the join resumes; this helper
    /// answers it with English.
    pub async fn join_game_flow(
        &self,
        user_id: i64,
        invite_code: &str,
        player_name: &str,
        wishlist_line: &str,
    ) {
        self.text(user_id, &format!("/start {}", invite_code)).await;
        if matches!(
            self.state_of(user_id).await,
            Some(ConversationState::AwaitingLanguage { .. })
        ) {
            self.callback(user_id, "lang:en").await;
        }
        self.text(user_id, player_name).await;
        self.text(user_id, wishlist_line).await;
        self.text(user_id, "Done").await;
    }
}

/// Today plus the given number of days, formatted the way users type dates
pub fn date_in_days(days: i64) -> String {
    (Utc::now().date_naive() + chrono::Duration::days(days))
        .format("%d.%m.%Y")
        .to_string()
}
