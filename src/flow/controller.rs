use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::events::{CallbackAction, CallbackEvent, TextMessageEvent};
use super::render;
use crate::conversation::{ConversationState, PostLanguageAction, StateCache};
use crate::game::models::{validate_game_name, DateError, GameModel, GameStatus, MIN_PARTICIPANTS};
use crate::game::service::{
    AddParticipantResult, GameService, LeaveGameResult, SetDateOutcome, WishlistOutcome,
};
use crate::localization::{Language, Localizer, MessageKey, FALLBACK_LANGUAGE};
use crate::messenger::{Messenger, SendOptions};
use crate::player::models::{validate_player_name, PlayerModel, MAX_PLAYER_NAME_CHARS};
use crate::player::repository::PlayerRepository;
use crate::shared::{AppError, AppState, KeyedMutex};

/// Maximum length of an anonymous message to a giftee
pub const MAX_ANON_MESSAGE_CHARS: usize = 1000;

/// Routes inbound chat events by the sender's conversation state.
///
/// Each event is handled under a per-user lock so the sender's state is read
/// and written atomically even when the transport delivers events
/// concurrently. Every store mutation is written through before the
/// corresponding outbound message goes out.
pub struct FlowController {
    players: Arc<dyn PlayerRepository + Send + Sync>,
    games: GameService,
    states: Arc<StateCache>,
    messenger: Arc<dyn Messenger>,
    localizer: Arc<dyn Localizer>,
    user_locks: KeyedMutex<i64>,
    bot_username: String,
}

impl FlowController {
    pub fn new(
        app: AppState,
        messenger: Arc<dyn Messenger>,
        localizer: Arc<dyn Localizer>,
        states: Arc<StateCache>,
        bot_username: String,
    ) -> Self {
        Self {
            players: app.players.clone(),
            games: GameService::new(app.games),
            states,
            messenger,
            localizer,
            user_locks: KeyedMutex::new(),
            bot_username,
        }
    }

    /// Entry point for plain text messages
    #[instrument(skip(self, event), fields(user_id = event.sender_id))]
    pub async fn handle_text(&self, event: TextMessageEvent) -> Result<(), AppError> {
        let _guard = self.user_locks.lock(&event.sender_id).await;

        let (player, is_new) = self.register_player(&event).await?;
        let text = event.text.trim().to_string();

        // Deep-link entry: "/start" or "/start <invite-code>". Re-entering
        // here aborts whatever flow was active, with the same cleanup as an
        // explicit cancel.
        if text == "/start" || text.starts_with("/start ") {
            if let Some(state) = self.states.get(player.id).await {
                self.abort_flow_side_effects(&player, &state).await?;
                self.states.clear(player.id).await?;
            }
            let payload = text.trim_start_matches("/start").trim();
            if payload.is_empty() {
                self.send_welcome(&player).await;
                return Ok(());
            }
            return self.enter_join_by_invite(&player, is_new, payload).await;
        }

        let state = self.states.get(player.id).await;

        // Cancel aborts any flow except anonymous messaging, where the word
        // is just part of the message
        if self.matches_label(&text, MessageKey::CancelLabel, player.language)
            && !matches!(
                state,
                Some(ConversationState::AwaitingAnonymousMessage { .. })
            )
        {
            return match state {
                Some(state) => self.cancel_flow(&player, state).await,
                None => {
                    self.send_with_menu(&player, MessageKey::NothingToCancel, &[])
                        .await;
                    Ok(())
                }
            };
        }

        match state {
            Some(state) => self.dispatch_state(&player, state, &text).await,
            None => self.dispatch_menu(&player, &text).await,
        }
    }

    /// Entry point for button callbacks
    #[instrument(skip(self, event), fields(user_id = event.sender_id, data = %event.data))]
    pub async fn handle_callback(&self, event: CallbackEvent) -> Result<(), AppError> {
        let _guard = self.user_locks.lock(&event.sender_id).await;

        let player = match self.players.get_player(event.sender_id).await? {
            Some(player) => player,
            None => {
                // Unknown sender: reset whatever state might linger and bail
                warn!(user_id = event.sender_id, "Callback from unregistered user");
                self.states.clear(event.sender_id).await?;
                self.ack(&event, None, false).await;
                return Ok(());
            }
        };

        let action = match CallbackAction::decode(&event.data) {
            Some(action) => action,
            None => {
                debug!(data = %event.data, "Undecodable callback data");
                self.ack(&event, None, false).await;
                return Ok(());
            }
        };

        match action {
            CallbackAction::SetLanguage(language) => {
                self.on_set_language(&player, &event, language).await
            }
            CallbackAction::ViewGame(game_id) => self.on_view_game(&player, &event, &game_id).await,
            CallbackAction::EditWishlist(game_id) => {
                self.on_edit_wishlist(&player, &event, &game_id).await
            }
            CallbackAction::LeaveGame(game_id) => {
                self.on_leave_game(&player, &event, &game_id).await
            }
            CallbackAction::DeleteGame(game_id) => {
                self.on_delete_game(&player, &event, &game_id).await
            }
            CallbackAction::StartNow(game_id) => self.on_start_now(&player, &event, &game_id).await,
            CallbackAction::AnonMessage(game_id) => {
                self.on_anon_message_start(&player, &event, &game_id).await
            }
        }
    }

    // ------------------------------------------------------------------
    // Registration and entry
    // ------------------------------------------------------------------

    /// Looks the sender up, registering them on first contact with a name
    /// snapshot and the language inferred from the reported locale
    async fn register_player(
        &self,
        event: &TextMessageEvent,
    ) -> Result<(PlayerModel, bool), AppError> {
        if let Some(mut existing) = self.players.get_player(event.sender_id).await? {
            if existing.handle != event.sender_handle {
                existing.handle = event.sender_handle.clone();
                self.players.upsert_player(&existing).await?;
            }
            return Ok((existing, false));
        }

        let language = event
            .sender_locale
            .as_deref()
            .and_then(Language::from_locale)
            .unwrap_or_default();
        let name = render::escape(
            &event
                .sender_name
                .trim()
                .chars()
                .take(MAX_PLAYER_NAME_CHARS)
                .collect::<String>(),
        );
        let player = PlayerModel::new(event.sender_id, name, event.sender_handle.clone(), language);
        self.players.upsert_player(&player).await?;

        info!(user_id = player.id, language = %player.language, "Player registered");
        Ok((player, true))
    }

    async fn enter_join_by_invite(
        &self,
        player: &PlayerModel,
        is_new: bool,
        code: &str,
    ) -> Result<(), AppError> {
        let game = match self.games.find_by_invite_code(code).await? {
            Some(game) => game,
            None => {
                debug!(code = %code, "Unknown invite code");
                self.send_with_menu(player, MessageKey::GameNotFound, &[])
                    .await;
                return Ok(());
            }
        };

        if is_new {
            // New players pick a language before anything else; the join
            // resumes from the language callback
            self.states
                .set(
                    player.id,
                    ConversationState::AwaitingLanguage {
                        then: PostLanguageAction::JoinGame {
                            game_id: game.id.clone(),
                        },
                    },
                )
                .await?;
            self.send_language_prompt(player).await;
            return Ok(());
        }

        self.resume_join(player, &game).await
    }

    async fn resume_join(&self, player: &PlayerModel, game: &GameModel) -> Result<(), AppError> {
        if game.status != GameStatus::Recruiting {
            self.send_with_menu(player, MessageKey::GameAlreadyStarted, &[])
                .await;
            return Ok(());
        }

        if game.has_participant(player.id) {
            self.send_with_menu(player, MessageKey::AlreadyParticipant, &[])
                .await;
            self.send_game_card(player, game).await;
            return Ok(());
        }

        self.states
            .set(
                player.id,
                ConversationState::AwaitingPlayerName {
                    game_id: game.id.clone(),
                    is_creator: false,
                },
            )
            .await?;
        self.send_prompt(player, MessageKey::AskPlayerName, &[]).await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stateless menu commands
    // ------------------------------------------------------------------

    async fn dispatch_menu(&self, player: &PlayerModel, text: &str) -> Result<(), AppError> {
        if self.matches_label(text, MessageKey::MenuCreateGame, player.language) {
            self.states
                .set(player.id, ConversationState::AwaitingGameName)
                .await?;
            self.send_prompt(player, MessageKey::AskGameName, &[]).await;
            return Ok(());
        }

        if self.matches_label(text, MessageKey::MenuMyGames, player.language) {
            return self.show_my_games(player).await;
        }

        if self.matches_label(text, MessageKey::MenuChangeLanguage, player.language) {
            self.states
                .set(
                    player.id,
                    ConversationState::AwaitingLanguage {
                        then: PostLanguageAction::ShowWelcome,
                    },
                )
                .await?;
            self.send_language_prompt(player).await;
            return Ok(());
        }

        self.send_with_menu(player, MessageKey::UnknownCommand, &[])
            .await;
        Ok(())
    }

    async fn show_my_games(&self, player: &PlayerModel) -> Result<(), AppError> {
        let mut games = self.games.games_for_player(player.id).await?;
        games.retain(|game| game.status != GameStatus::Finished);

        if games.is_empty() {
            self.send_with_menu(player, MessageKey::MyGamesEmpty, &[])
                .await;
            return Ok(());
        }

        games.sort_by(|a, b| a.name.cmp(&b.name));
        self.send_with_menu(player, MessageKey::MyGamesHeader, &[])
            .await;
        for game in &games {
            self.send_game_card(player, game).await;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stateful text dispatch
    // ------------------------------------------------------------------

    async fn dispatch_state(
        &self,
        player: &PlayerModel,
        state: ConversationState,
        text: &str,
    ) -> Result<(), AppError> {
        match state {
            ConversationState::AwaitingLanguage { .. } => {
                // A button press is expected here, not text
                self.send_language_prompt(player).await;
                Ok(())
            }
            ConversationState::AwaitingGameName => self.on_game_name(player, text).await,
            ConversationState::AwaitingStartDate { game_id } => {
                self.on_start_date(player, &game_id, text).await
            }
            ConversationState::AwaitingEndDate { game_id } => {
                self.on_end_date(player, &game_id, text).await
            }
            ConversationState::AwaitingPlayerName {
                game_id,
                is_creator,
            } => self.on_player_name(player, &game_id, is_creator, text).await,
            ConversationState::AwaitingWishlist {
                game_id,
                is_creator,
            } => self.on_wishlist(player, &game_id, is_creator, text).await,
            ConversationState::AwaitingAnonymousMessage { game_id } => {
                self.on_anon_message(player, &game_id, text).await
            }
        }
    }

    async fn on_game_name(&self, player: &PlayerModel, text: &str) -> Result<(), AppError> {
        let name = match validate_game_name(text) {
            Some(name) => render::escape(&name),
            None => {
                self.send_prompt(player, MessageKey::GameNameInvalid, &[])
                    .await;
                return Ok(());
            }
        };

        let game = self.games.create_game(name, player.id).await?;
        self.states
            .set(
                player.id,
                ConversationState::AwaitingStartDate {
                    game_id: game.id.clone(),
                },
            )
            .await?;
        self.send_prompt(player, MessageKey::AskStartDate, &[]).await;
        Ok(())
    }

    async fn on_start_date(
        &self,
        player: &PlayerModel,
        game_id: &str,
        text: &str,
    ) -> Result<(), AppError> {
        let date = match parse_date(text) {
            Some(date) => date,
            None => {
                self.send_prompt(player, MessageKey::DateFormatError, &[])
                    .await;
                return Ok(());
            }
        };

        let today = Utc::now().date_naive();
        match self.games.set_start_date(game_id, date, today).await? {
            SetDateOutcome::Updated(_) => {
                self.states
                    .set(
                        player.id,
                        ConversationState::AwaitingEndDate {
                            game_id: game_id.to_string(),
                        },
                    )
                    .await?;
                self.send_prompt(player, MessageKey::AskEndDate, &[]).await;
            }
            SetDateOutcome::Rejected(DateError::StartNotInFuture) => {
                self.send_prompt(player, MessageKey::StartDatePast, &[]).await;
            }
            SetDateOutcome::Rejected(DateError::StartTooFarAhead) => {
                self.send_prompt(player, MessageKey::StartDateTooFar, &[])
                    .await;
            }
            SetDateOutcome::Rejected(_) => {
                self.send_prompt(player, MessageKey::DateFormatError, &[])
                    .await;
            }
            SetDateOutcome::GameNotFound => {
                self.states.clear(player.id).await?;
                self.send_with_menu(player, MessageKey::GameNotFound, &[])
                    .await;
            }
        }
        Ok(())
    }

    async fn on_end_date(
        &self,
        player: &PlayerModel,
        game_id: &str,
        text: &str,
    ) -> Result<(), AppError> {
        let date = match parse_date(text) {
            Some(date) => date,
            None => {
                self.send_prompt(player, MessageKey::DateFormatError, &[])
                    .await;
                return Ok(());
            }
        };

        match self.games.set_end_date(game_id, date).await? {
            SetDateOutcome::Updated(_) => {
                self.states
                    .set(
                        player.id,
                        ConversationState::AwaitingPlayerName {
                            game_id: game_id.to_string(),
                            is_creator: true,
                        },
                    )
                    .await?;
                self.send_prompt(player, MessageKey::AskPlayerName, &[]).await;
            }
            SetDateOutcome::Rejected(DateError::EndNotAfterStart) => {
                self.send_prompt(player, MessageKey::EndDateNotAfterStart, &[])
                    .await;
            }
            SetDateOutcome::Rejected(DateError::EndTooFarAfterStart) => {
                self.send_prompt(player, MessageKey::EndDateTooFar, &[]).await;
            }
            SetDateOutcome::Rejected(_) => {
                self.send_prompt(player, MessageKey::DateFormatError, &[])
                    .await;
            }
            SetDateOutcome::GameNotFound => {
                self.states.clear(player.id).await?;
                self.send_with_menu(player, MessageKey::GameNotFound, &[])
                    .await;
            }
        }
        Ok(())
    }

    async fn on_player_name(
        &self,
        player: &PlayerModel,
        game_id: &str,
        is_creator: bool,
        text: &str,
    ) -> Result<(), AppError> {
        let name = match validate_player_name(text) {
            Some(name) => render::escape(&name),
            None => {
                self.send_prompt(player, MessageKey::PlayerNameInvalid, &[])
                    .await;
                return Ok(());
            }
        };

        // Name re-entry mutates the player record itself
        let mut updated = player.clone();
        updated.name = name.clone();
        self.players.upsert_player(&updated).await?;

        match self.games.add_participant(game_id, player.id, name).await? {
            AddParticipantResult::Added(_) => {
                self.states
                    .set(
                        player.id,
                        ConversationState::AwaitingWishlist {
                            game_id: game_id.to_string(),
                            is_creator,
                        },
                    )
                    .await?;
                let done = self.localizer.localize(MessageKey::DoneLabel, player.language);
                self.send_prompt(player, MessageKey::AskWishlist, &[("done", &done)])
                    .await;
            }
            AddParticipantResult::NotJoinable(_) => {
                self.states.clear(player.id).await?;
                self.send_with_menu(player, MessageKey::GameAlreadyStarted, &[])
                    .await;
            }
            AddParticipantResult::GameNotFound => {
                self.states.clear(player.id).await?;
                self.send_with_menu(player, MessageKey::GameNotFound, &[])
                    .await;
            }
        }
        Ok(())
    }

    async fn on_wishlist(
        &self,
        player: &PlayerModel,
        game_id: &str,
        is_creator: bool,
        text: &str,
    ) -> Result<(), AppError> {
        let done = self.localizer.localize(MessageKey::DoneLabel, player.language);

        if self.matches_label(text, MessageKey::DoneLabel, player.language) {
            return self.on_wishlist_done(player, game_id, is_creator).await;
        }

        let line = render::escape(text.trim());
        if line.is_empty() {
            self.send_prompt(player, MessageKey::AskWishlist, &[("done", &done)])
                .await;
            return Ok(());
        }

        match self
            .games
            .append_wishlist_line(game_id, player.id, &line)
            .await?
        {
            WishlistOutcome::Updated(_) => {
                self.send_prompt(player, MessageKey::WishlistLineAdded, &[("done", &done)])
                    .await;
            }
            WishlistOutcome::TooLong => {
                self.send_prompt(player, MessageKey::WishlistTooLong, &[]).await;
            }
            WishlistOutcome::NotParticipant | WishlistOutcome::GameNotFound => {
                self.states.clear(player.id).await?;
                self.send_with_menu(player, MessageKey::GameNotFound, &[])
                    .await;
            }
        }
        Ok(())
    }

    async fn on_wishlist_done(
        &self,
        player: &PlayerModel,
        game_id: &str,
        is_creator: bool,
    ) -> Result<(), AppError> {
        if is_creator {
            // The creator finishing their wishlist publishes the game
            let game = match self.games.open_recruiting(game_id).await? {
                Some(game) => game,
                None => {
                    self.states.clear(player.id).await?;
                    self.send_with_menu(player, MessageKey::GameNotFound, &[])
                        .await;
                    return Ok(());
                }
            };

            self.states.clear(player.id).await?;
            let link = render::invite_link(
                &self.bot_username,
                game.invite_code.as_deref().unwrap_or_default(),
            );
            self.send_with_menu(
                player,
                MessageKey::GameCreated,
                &[("name", game.name.as_str()), ("link", link.as_str())],
            )
            .await;
            return Ok(());
        }

        let game = match self.games.get_game(game_id).await? {
            Some(game) => game,
            None => {
                self.states.clear(player.id).await?;
                self.send_with_menu(player, MessageKey::GameNotFound, &[])
                    .await;
                return Ok(());
            }
        };

        self.states.clear(player.id).await?;
        self.send_with_menu(player, MessageKey::JoinedGame, &[("name", game.name.as_str())])
            .await;
        Ok(())
    }

    async fn on_anon_message(
        &self,
        player: &PlayerModel,
        game_id: &str,
        text: &str,
    ) -> Result<(), AppError> {
        if text.chars().count() > MAX_ANON_MESSAGE_CHARS {
            self.send_prompt(player, MessageKey::AnonMessageTooLong, &[])
                .await;
            return Ok(());
        }

        let game = match self.games.get_game(game_id).await? {
            Some(game) if game.status == GameStatus::InProgress => game,
            _ => {
                self.states.clear(player.id).await?;
                self.send_with_menu(player, MessageKey::GameNotFound, &[])
                    .await;
                return Ok(());
            }
        };

        let giftee_id = match game.giftee_of(player.id) {
            Some(giftee_id) => giftee_id,
            None => {
                self.states.clear(player.id).await?;
                self.send_with_menu(player, MessageKey::GameNotFound, &[])
                    .await;
                return Ok(());
            }
        };

        self.states.clear(player.id).await?;

        let sanitized = render::escape(text.trim());
        self.notify(giftee_id, MessageKey::AnonMessageHeader, &[("text", &sanitized)])
            .await;
        self.send_with_menu(player, MessageKey::AnonMessageSent, &[])
            .await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cancellation
    // ------------------------------------------------------------------

    /// Aborts the current flow. Mid-creation games are deleted; a joiner is
    /// removed from the game without affecting it otherwise.
    async fn cancel_flow(
        &self,
        player: &PlayerModel,
        state: ConversationState,
    ) -> Result<(), AppError> {
        self.abort_flow_side_effects(player, &state).await?;
        self.states.clear(player.id).await?;
        self.send_with_menu(player, MessageKey::FlowCancelled, &[])
            .await;
        Ok(())
    }

    async fn abort_flow_side_effects(
        &self,
        player: &PlayerModel,
        state: &ConversationState,
    ) -> Result<(), AppError> {
        match state {
            ConversationState::AwaitingStartDate { game_id }
            | ConversationState::AwaitingEndDate { game_id } => {
                self.delete_abandoned_game(game_id).await?;
            }
            ConversationState::AwaitingPlayerName {
                game_id,
                is_creator,
            }
            | ConversationState::AwaitingWishlist {
                game_id,
                is_creator,
            } => {
                if *is_creator {
                    self.delete_abandoned_game(game_id).await?;
                } else {
                    self.games.leave(game_id, player.id).await?;
                }
            }
            ConversationState::AwaitingLanguage { .. }
            | ConversationState::AwaitingGameName
            | ConversationState::AwaitingAnonymousMessage { .. } => {}
        }
        Ok(())
    }

    async fn delete_abandoned_game(&self, game_id: &str) -> Result<(), AppError> {
        if self.games.delete(game_id).await?.is_some() {
            self.states.clear_for_game(game_id).await?;
            info!(game_id = %game_id, "Abandoned game deleted");
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Callback actions
    // ------------------------------------------------------------------

    async fn on_set_language(
        &self,
        player: &PlayerModel,
        event: &CallbackEvent,
        language: Language,
    ) -> Result<(), AppError> {
        let mut updated = player.clone();
        updated.language = language;
        self.players.upsert_player(&updated).await?;
        info!(user_id = player.id, language = %language, "Language changed");

        self.ack(event, None, false).await;

        match self.states.get(player.id).await {
            Some(ConversationState::AwaitingLanguage { then }) => {
                self.states.clear(updated.id).await?;
                match then {
                    PostLanguageAction::ShowWelcome => {
                        self.send_welcome(&updated).await;
                    }
                    PostLanguageAction::JoinGame { game_id } => {
                        match self.games.get_game(&game_id).await? {
                            Some(game) => self.resume_join(&updated, &game).await?,
                            None => {
                                self.send_with_menu(&updated, MessageKey::GameNotFound, &[])
                                    .await;
                            }
                        }
                    }
                }
            }
            _ => {
                self.send_with_menu(&updated, MessageKey::LanguageSaved, &[])
                    .await;
            }
        }
        Ok(())
    }

    async fn on_view_game(
        &self,
        player: &PlayerModel,
        event: &CallbackEvent,
        game_id: &str,
    ) -> Result<(), AppError> {
        match self.games.get_game(game_id).await? {
            Some(game) => {
                self.ack(event, None, false).await;
                self.send_game_card(player, &game).await;
            }
            None => {
                self.ack_alert(event, player, MessageKey::GameNotFound).await;
            }
        }
        Ok(())
    }

    async fn on_edit_wishlist(
        &self,
        player: &PlayerModel,
        event: &CallbackEvent,
        game_id: &str,
    ) -> Result<(), AppError> {
        let game = match self.games.get_game(game_id).await? {
            Some(game) => game,
            None => {
                self.ack_alert(event, player, MessageKey::GameNotFound).await;
                return Ok(());
            }
        };

        if !game.has_participant(player.id) || game.status == GameStatus::Finished {
            self.ack_alert(event, player, MessageKey::GameNotFound).await;
            return Ok(());
        }

        // Editing starts from a blank wishlist
        self.games.clear_wishlist(game_id, player.id).await?;
        self.states
            .set(
                player.id,
                ConversationState::AwaitingWishlist {
                    game_id: game_id.to_string(),
                    is_creator: false,
                },
            )
            .await?;

        self.ack(event, None, false).await;
        let done = self.localizer.localize(MessageKey::DoneLabel, player.language);
        self.send_prompt(player, MessageKey::AskWishlist, &[("done", &done)])
            .await;
        Ok(())
    }

    async fn on_leave_game(
        &self,
        player: &PlayerModel,
        event: &CallbackEvent,
        game_id: &str,
    ) -> Result<(), AppError> {
        match self.games.leave(game_id, player.id).await? {
            LeaveGameResult::Left(game) => {
                // A stale flow targeting this game makes no sense anymore
                if self.states.get(player.id).await.and_then(|s| s.game_id().map(String::from))
                    == Some(game_id.to_string())
                {
                    self.states.clear(player.id).await?;
                }
                self.ack(event, None, false).await;
                self.send_with_menu(player, MessageKey::LeftGame, &[("name", game.name.as_str())])
                    .await;
            }
            LeaveGameResult::NotParticipant => {
                self.ack(event, None, false).await;
            }
            LeaveGameResult::GameNotFound => {
                self.ack_alert(event, player, MessageKey::GameNotFound).await;
            }
        }
        Ok(())
    }

    async fn on_delete_game(
        &self,
        player: &PlayerModel,
        event: &CallbackEvent,
        game_id: &str,
    ) -> Result<(), AppError> {
        let game = match self.games.get_game(game_id).await? {
            Some(game) => game,
            None => {
                self.ack_alert(event, player, MessageKey::GameNotFound).await;
                return Ok(());
            }
        };

        if game.creator_id != player.id {
            self.ack_alert(event, player, MessageKey::OnlyCreatorError)
                .await;
            return Ok(());
        }

        // Deletable only until the game starts
        if game.status >= GameStatus::InProgress {
            self.ack_alert(event, player, MessageKey::GameAlreadyStarted)
                .await;
            return Ok(());
        }

        let snapshot = match self.games.delete(game_id).await? {
            Some(snapshot) => snapshot,
            None => {
                self.ack_alert(event, player, MessageKey::GameNotFound).await;
                return Ok(());
            }
        };
        self.states.clear_for_game(game_id).await?;

        self.ack(event, None, false).await;
        for participant in snapshot.participants.values() {
            if participant.user_id == player.id {
                continue;
            }
            self.notify(
                participant.user_id,
                MessageKey::GameCancelledNotice,
                &[("name", snapshot.name.as_str())],
            )
            .await;
        }
        self.send_with_menu(player, MessageKey::GameDeleted, &[("name", snapshot.name.as_str())])
            .await;
        Ok(())
    }

    async fn on_start_now(
        &self,
        player: &PlayerModel,
        event: &CallbackEvent,
        game_id: &str,
    ) -> Result<(), AppError> {
        let game = match self.games.get_game(game_id).await? {
            Some(game) => game,
            None => {
                self.ack_alert(event, player, MessageKey::GameNotFound).await;
                return Ok(());
            }
        };

        if game.creator_id != player.id {
            self.ack_alert(event, player, MessageKey::OnlyCreatorError)
                .await;
            return Ok(());
        }

        // The manual path must not transition an understaffed game; the
        // creator just gets told
        if game.participant_count() < MIN_PARTICIPANTS {
            self.ack_alert(event, player, MessageKey::NotEnoughParticipants)
                .await;
            return Ok(());
        }

        self.ack(event, None, false).await;
        self.launch_game(game_id).await
    }

    async fn on_anon_message_start(
        &self,
        player: &PlayerModel,
        event: &CallbackEvent,
        game_id: &str,
    ) -> Result<(), AppError> {
        let game = match self.games.get_game(game_id).await? {
            Some(game) if game.status == GameStatus::InProgress => game,
            _ => {
                self.ack_alert(event, player, MessageKey::GameNotFound).await;
                return Ok(());
            }
        };

        if game.giftee_of(player.id).is_none() {
            self.ack_alert(event, player, MessageKey::GameNotFound).await;
            return Ok(());
        }

        self.states
            .set(
                player.id,
                ConversationState::AwaitingAnonymousMessage {
                    game_id: game_id.to_string(),
                },
            )
            .await?;

        self.ack(event, None, false).await;
        // No cancel here: anything typed next is the message itself
        let text = self
            .localizer
            .localize(MessageKey::AskAnonMessage, player.language);
        self.messenger
            .send_text(player.id, &text, SendOptions::default())
            .await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Outbound helpers
    // ------------------------------------------------------------------

    async fn send_welcome(&self, player: &PlayerModel) {
        self.send_with_menu(player, MessageKey::Welcome, &[]).await;
    }

    async fn send_language_prompt(&self, player: &PlayerModel) {
        let text = self
            .localizer
            .localize(MessageKey::ChooseLanguage, player.language);
        let options = SendOptions::default().with_buttons(render::language_buttons());
        self.messenger.send_text(player.id, &text, options).await;
    }

    async fn send_game_card(&self, player: &PlayerModel, game: &GameModel) {
        let text = render::game_summary(game, player.id, self.localizer.as_ref(), player.language);
        let options = SendOptions::html().with_buttons(render::game_buttons(
            game,
            player.id,
            self.localizer.as_ref(),
            player.language,
        ));
        self.messenger.send_text(player.id, &text, options).await;
    }

    /// A flow prompt: localized text with a cancel button in the menu
    async fn send_prompt(&self, player: &PlayerModel, key: MessageKey, args: &[(&str, &str)]) {
        let text = self.localizer.localize_with(key, player.language, args);
        let cancel = self
            .localizer
            .localize(MessageKey::CancelLabel, player.language);
        let options = SendOptions::html().with_menu(vec![cancel]);
        self.messenger.send_text(player.id, &text, options).await;
    }

    /// A terminal message: localized text with the main menu restored
    async fn send_with_menu(&self, player: &PlayerModel, key: MessageKey, args: &[(&str, &str)]) {
        let text = self.localizer.localize_with(key, player.language, args);
        let options = SendOptions::html().with_menu(render::menu_labels(
            self.localizer.as_ref(),
            player.language,
        ));
        self.messenger.send_text(player.id, &text, options).await;
    }

    /// Sends to any user in their stored language. Used for notifications
    /// to participants other than the actor.
    pub(super) async fn notify(&self, user_id: i64, key: MessageKey, args: &[(&str, &str)]) {
        let language = self.language_of(user_id).await;
        let text = self.localizer.localize_with(key, language, args);
        self.messenger
            .send_text(user_id, &text, SendOptions::html())
            .await;
    }

    pub(super) async fn language_of(&self, user_id: i64) -> Language {
        match self.players.get_player(user_id).await {
            Ok(Some(player)) => player.language,
            _ => FALLBACK_LANGUAGE,
        }
    }

    async fn ack(&self, event: &CallbackEvent, text: Option<&str>, alert: bool) {
        self.messenger
            .acknowledge_callback(&event.callback_id, text, alert)
            .await;
    }

    async fn ack_alert(&self, event: &CallbackEvent, player: &PlayerModel, key: MessageKey) {
        let text = self.localizer.localize(key, player.language);
        self.ack(event, Some(&text), true).await;
    }

    fn matches_label(&self, text: &str, key: MessageKey, language: Language) -> bool {
        let candidate = text.trim().to_lowercase();
        if candidate == self.localizer.localize(key, language).to_lowercase() {
            return true;
        }
        // Keyboards rendered before a language switch still work
        candidate == self.localizer.localize(key, FALLBACK_LANGUAGE).to_lowercase()
    }

    pub(super) fn game_service(&self) -> &GameService {
        &self.games
    }

    pub(super) fn state_cache(&self) -> &StateCache {
        &self.states
    }
}

/// Parses a user-submitted date in the dd.mm.yyyy format
fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%d.%m.%Y").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("24.12.2026"),
            NaiveDate::from_ymd_opt(2026, 12, 24)
        );
        assert_eq!(parse_date(" 01.01.2027 "), NaiveDate::from_ymd_opt(2027, 1, 1));
        assert_eq!(parse_date("2026-12-24"), None);
        assert_eq!(parse_date("31.02.2026"), None);
        assert_eq!(parse_date("soon"), None);
    }
}
