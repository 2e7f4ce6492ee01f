// Public API - what other modules can use
pub use catalog::StaticLocalizer;

mod catalog;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Languages a player can choose for bot messages
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    Default,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ru,
    Uk,
    De,
    Es,
    Fr,
}

/// Language used when a key or a language has no translation
pub const FALLBACK_LANGUAGE: Language = Language::En;

impl TryFrom<String> for Language {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Language {
    /// Parses a chat-client locale string like "ru" or "de-DE"
    pub fn from_locale(locale: &str) -> Option<Self> {
        let code = locale.split(['-', '_']).next()?.to_lowercase();
        code.parse().ok()
    }

    /// Name of the language in the language itself, for selection buttons
    pub fn native_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ru => "Русский",
            Language::Uk => "Українська",
            Language::De => "Deutsch",
            Language::Es => "Español",
            Language::Fr => "Français",
        }
    }
}

/// Every user-visible message the bot can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    // Menu and shared labels
    Welcome,
    MenuCreateGame,
    MenuMyGames,
    MenuChangeLanguage,
    CancelLabel,
    DoneLabel,

    // Language selection
    ChooseLanguage,
    LanguageSaved,

    // Game creation flow
    AskGameName,
    GameNameInvalid,
    AskStartDate,
    DateFormatError,
    StartDatePast,
    StartDateTooFar,
    AskEndDate,
    EndDateNotAfterStart,
    EndDateTooFar,
    AskPlayerName,
    PlayerNameInvalid,
    AskWishlist,
    WishlistLineAdded,
    WishlistTooLong,
    GameCreated,
    JoinedGame,

    // Join-by-invite entry
    GameNotFound,
    GameAlreadyStarted,
    AlreadyParticipant,

    // Game listing and rendering
    MyGamesHeader,
    MyGamesEmpty,
    ViewStatus,
    ViewStartDate,
    ViewEndDate,
    ViewParticipants,
    YourGiftee,
    StatusCreating,
    StatusRecruiting,
    StatusInProgress,
    StatusFinished,

    // Inline buttons
    ButtonView,
    ButtonEditWishlist,
    ButtonLeave,
    ButtonDelete,
    ButtonStartNow,
    ButtonAnonMessage,

    // Game actions and lifecycle notifications
    LeftGame,
    OnlyCreatorError,
    GameCancelledNotice,
    GameDeleted,
    NotEnoughParticipants,
    GameStartedNotice,
    GameFinishedNotice,
    GameAbortedNotice,

    // Anonymous messaging
    AskAnonMessage,
    AnonMessageTooLong,
    AnonMessageSent,
    AnonMessageHeader,

    // Cancellation and fallback
    FlowCancelled,
    NothingToCancel,
    UnknownCommand,
}

/// Produces user-visible text for a message key in a given language
pub trait Localizer: Send + Sync {
    fn localize(&self, key: MessageKey, language: Language) -> String;

    /// Localizes a key and substitutes `{name}`-style placeholders
    fn localize_with(&self, key: MessageKey, language: Language, args: &[(&str, &str)]) -> String {
        let mut text = self.localize(key, language);
        for (name, value) in args {
            text = text.replace(&format!("{{{}}}", name), value);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_language_from_locale() {
        assert_eq!(Language::from_locale("ru"), Some(Language::Ru));
        assert_eq!(Language::from_locale("de-DE"), Some(Language::De));
        assert_eq!(Language::from_locale("uk_UA"), Some(Language::Uk));
        assert_eq!(Language::from_locale("ja"), None);
        assert_eq!(Language::from_locale(""), None);
    }

    #[test]
    fn test_language_round_trips_through_display() {
        for language in Language::iter() {
            let code = language.to_string();
            assert_eq!(code.parse::<Language>().unwrap(), language);
        }
    }

    #[test]
    fn test_localize_with_substitutes_placeholders() {
        let localizer = StaticLocalizer;
        let text = localizer.localize_with(
            MessageKey::GameStartedNotice,
            Language::En,
            &[("name", "Super Game"), ("giftee", "Alice")],
        );
        assert!(text.contains("Super Game"));
        assert!(text.contains("Alice"));
    }

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        let localizer = StaticLocalizer;
        let fallback = localizer.localize(MessageKey::Welcome, Language::De);
        let english = localizer.localize(MessageKey::Welcome, Language::En);
        assert_eq!(fallback, english);
    }
}
