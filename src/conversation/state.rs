use serde::{Deserialize, Serialize};

/// What to do after the user picks a language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostLanguageAction {
    ShowWelcome,
    JoinGame { game_id: String },
}

/// Per-user conversation state: which free-text input the bot expects next.
///
/// At most one state is active per user. A state is created when a flow step
/// needs input, and cleared when the step completes, is cancelled, or the
/// targeted game is deleted. Persisted as a `(tag, payload)` pair so it
/// survives process restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "payload", rename_all = "snake_case")]
pub enum ConversationState {
    AwaitingLanguage {
        then: PostLanguageAction,
    },
    AwaitingGameName,
    AwaitingStartDate {
        game_id: String,
    },
    AwaitingEndDate {
        game_id: String,
    },
    AwaitingPlayerName {
        game_id: String,
        is_creator: bool,
    },
    AwaitingWishlist {
        game_id: String,
        is_creator: bool,
    },
    AwaitingAnonymousMessage {
        game_id: String,
    },
}

impl ConversationState {
    /// The game this state targets, if any. Used to clear stale states when
    /// a game goes away.
    pub fn game_id(&self) -> Option<&str> {
        match self {
            ConversationState::AwaitingLanguage {
                then: PostLanguageAction::JoinGame { game_id },
            } => Some(game_id),
            ConversationState::AwaitingLanguage { .. } => None,
            ConversationState::AwaitingGameName => None,
            ConversationState::AwaitingStartDate { game_id }
            | ConversationState::AwaitingEndDate { game_id }
            | ConversationState::AwaitingPlayerName { game_id, .. }
            | ConversationState::AwaitingWishlist { game_id, .. }
            | ConversationState::AwaitingAnonymousMessage { game_id } => Some(game_id),
        }
    }

    /// Serializes to the stored `(tag, payload)` form. The payload is empty
    /// for variants without fields.
    pub fn to_row(&self) -> Result<(String, String), serde_json::Error> {
        let value = serde_json::to_value(self)?;
        let tag = value
            .get("tag")
            .and_then(|tag| tag.as_str())
            .unwrap_or_default()
            .to_string();
        let payload = value
            .get("payload")
            .map(|payload| payload.to_string())
            .unwrap_or_default();
        Ok((tag, payload))
    }

    /// Reconstructs a state from its stored `(tag, payload)` form
    pub fn from_row(tag: &str, payload: &str) -> Result<Self, serde_json::Error> {
        let mut object = serde_json::Map::new();
        object.insert(
            "tag".to_string(),
            serde_json::Value::String(tag.to_string()),
        );
        if !payload.trim().is_empty() {
            object.insert("payload".to_string(), serde_json::from_str(payload)?);
        }
        serde_json::from_value(serde_json::Value::Object(object))
    }
}
