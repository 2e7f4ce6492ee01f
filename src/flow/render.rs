use chrono::NaiveDate;
use strum::IntoEnumIterator;

use super::events::CallbackAction;
use crate::game::models::{GameModel, GameStatus};
use crate::localization::{Language, Localizer, MessageKey};
use crate::messenger::Button;

/// Escapes markup-significant characters so free text cannot inject into
/// the rich-text rendering format. Applied to every free-text field before
/// it is stored.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Join link carrying the invite code as the start parameter
pub fn invite_link(bot_username: &str, invite_code: &str) -> String {
    format!("https://t.me/{}?start={}", bot_username, invite_code)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

fn status_label(status: GameStatus, localizer: &dyn Localizer, language: Language) -> String {
    let key = match status {
        GameStatus::Creating => MessageKey::StatusCreating,
        GameStatus::Recruiting => MessageKey::StatusRecruiting,
        GameStatus::InProgress => MessageKey::StatusInProgress,
        GameStatus::Finished => MessageKey::StatusFinished,
    };
    localizer.localize(key, language)
}

/// Renders a game card for the viewer: name, status, dates, participants
/// and, once the game runs, the viewer's giftee with their wishlist.
pub fn game_summary(
    game: &GameModel,
    viewer_id: i64,
    localizer: &dyn Localizer,
    language: Language,
) -> String {
    let mut lines = vec![format!("<b>{}</b>", game.name)];

    lines.push(format!(
        "{}: {}",
        localizer.localize(MessageKey::ViewStatus, language),
        status_label(game.status, localizer, language)
    ));

    if let Some(start) = game.start_date {
        lines.push(format!(
            "{}: {}",
            localizer.localize(MessageKey::ViewStartDate, language),
            format_date(start)
        ));
    }
    if let Some(end) = game.end_date {
        lines.push(format!(
            "{}: {}",
            localizer.localize(MessageKey::ViewEndDate, language),
            format_date(end)
        ));
    }

    let mut names: Vec<&str> = game.participants.values().map(|p| p.name.as_str()).collect();
    names.sort_unstable();
    lines.push(format!(
        "{} ({}): {}",
        localizer.localize(MessageKey::ViewParticipants, language),
        names.len(),
        names.join(", ")
    ));

    if game.status == GameStatus::InProgress {
        if let Some(giftee_id) = game.giftee_of(viewer_id) {
            let giftee_name = game.participant_name(giftee_id).unwrap_or_default();
            let wishlist = game.wishlist_of(giftee_id).unwrap_or("—");
            lines.push(String::new());
            lines.push(localizer.localize_with(
                MessageKey::YourGiftee,
                language,
                &[("name", giftee_name), ("wishlist", wishlist)],
            ));
        }
    }

    lines.join("\n")
}

/// Inline keyboard for a game card, scoped to what the viewer may do
pub fn game_buttons(
    game: &GameModel,
    viewer_id: i64,
    localizer: &dyn Localizer,
    language: Language,
) -> Vec<Vec<Button>> {
    let mut rows = vec![vec![Button::new(
        localizer.localize(MessageKey::ButtonView, language),
        CallbackAction::ViewGame(game.id.clone()).encode(),
    )]];

    if game.status == GameStatus::Recruiting {
        rows.push(vec![
            Button::new(
                localizer.localize(MessageKey::ButtonEditWishlist, language),
                CallbackAction::EditWishlist(game.id.clone()).encode(),
            ),
            Button::new(
                localizer.localize(MessageKey::ButtonLeave, language),
                CallbackAction::LeaveGame(game.id.clone()).encode(),
            ),
        ]);
        if game.creator_id == viewer_id {
            rows.push(vec![
                Button::new(
                    localizer.localize(MessageKey::ButtonStartNow, language),
                    CallbackAction::StartNow(game.id.clone()).encode(),
                ),
                Button::new(
                    localizer.localize(MessageKey::ButtonDelete, language),
                    CallbackAction::DeleteGame(game.id.clone()).encode(),
                ),
            ]);
        }
    }

    if game.status == GameStatus::InProgress && game.giftee_of(viewer_id).is_some() {
        rows.push(vec![Button::new(
            localizer.localize(MessageKey::ButtonAnonMessage, language),
            CallbackAction::AnonMessage(game.id.clone()).encode(),
        )]);
    }

    rows
}

/// One button per supported language, two per row
pub fn language_buttons() -> Vec<Vec<Button>> {
    let mut rows: Vec<Vec<Button>> = Vec::new();
    for language in Language::iter() {
        let button = Button::new(
            language.native_name(),
            CallbackAction::SetLanguage(language).encode(),
        );
        match rows.last_mut() {
            Some(row) if row.len() < 2 => row.push(button),
            _ => rows.push(vec![button]),
        }
    }
    rows
}

/// The persistent main-menu reply keyboard
pub fn menu_labels(localizer: &dyn Localizer, language: Language) -> Vec<String> {
    vec![
        localizer.localize(MessageKey::MenuCreateGame, language),
        localizer.localize(MessageKey::MenuMyGames, language),
        localizer.localize(MessageKey::MenuChangeLanguage, language),
    ]
}
