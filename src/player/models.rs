use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::localization::Language;

/// Maximum length of a player display name after trimming
pub const MAX_PLAYER_NAME_CHARS: usize = 50;

/// A registered chat user.
///
/// Created on first interaction, keyed by the transport's numeric user id.
/// Never deleted: historical games keep referencing it.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PlayerModel {
    pub id: i64,
    pub name: String,
    pub handle: Option<String>,
    #[sqlx(try_from = "String")]
    pub language: Language,
}

impl PlayerModel {
    pub fn new(id: i64, name: String, handle: Option<String>, language: Language) -> Self {
        Self {
            id,
            name,
            handle,
            language,
        }
    }
}

/// Trims a submitted display name and validates the length bound.
/// Returns the trimmed name, or None when blank or too long.
pub fn validate_player_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_PLAYER_NAME_CHARS {
        return None;
    }
    Some(trimmed.to_string())
}
