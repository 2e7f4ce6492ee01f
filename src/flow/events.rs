use crate::localization::Language;

/// A plain text message from the chat transport
#[derive(Debug, Clone)]
pub struct TextMessageEvent {
    pub sender_id: i64,
    /// Display name as reported by the transport
    pub sender_name: String,
    pub sender_handle: Option<String>,
    /// Client-reported locale, e.g. "en" or "ru-RU"
    pub sender_locale: Option<String>,
    pub text: String,
}

/// A button press from the chat transport
#[derive(Debug, Clone)]
pub struct CallbackEvent {
    pub sender_id: i64,
    pub callback_id: String,
    pub data: String,
    pub originating_message_id: Option<i64>,
}

/// Parsed callback button data.
///
/// Encoded as a compact `tag:argument` string so it fits transport limits on
/// callback payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    ViewGame(String),
    EditWishlist(String),
    LeaveGame(String),
    DeleteGame(String),
    StartNow(String),
    AnonMessage(String),
    SetLanguage(Language),
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::ViewGame(game_id) => format!("view:{}", game_id),
            CallbackAction::EditWishlist(game_id) => format!("wishlist:{}", game_id),
            CallbackAction::LeaveGame(game_id) => format!("leave:{}", game_id),
            CallbackAction::DeleteGame(game_id) => format!("delete:{}", game_id),
            CallbackAction::StartNow(game_id) => format!("start:{}", game_id),
            CallbackAction::AnonMessage(game_id) => format!("anon:{}", game_id),
            CallbackAction::SetLanguage(language) => format!("lang:{}", language),
        }
    }

    pub fn decode(data: &str) -> Option<Self> {
        let (tag, argument) = data.split_once(':')?;
        if argument.is_empty() {
            return None;
        }
        match tag {
            "view" => Some(CallbackAction::ViewGame(argument.to_string())),
            "wishlist" => Some(CallbackAction::EditWishlist(argument.to_string())),
            "leave" => Some(CallbackAction::LeaveGame(argument.to_string())),
            "delete" => Some(CallbackAction::DeleteGame(argument.to_string())),
            "start" => Some(CallbackAction::StartNow(argument.to_string())),
            "anon" => Some(CallbackAction::AnonMessage(argument.to_string())),
            "lang" => argument.parse().ok().map(CallbackAction::SetLanguage),
            _ => None,
        }
    }
}
