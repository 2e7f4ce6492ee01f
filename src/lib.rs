// Library crate for the Secret Santa coordination bot core
// This file exposes the public API for integration tests and transport adapters

pub mod conversation;
pub mod flow;
pub mod game;
pub mod localization;
pub mod messenger;
pub mod player;
pub mod scheduler;
pub mod settings;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use conversation::{ConversationState, PostLanguageAction, StateCache};
pub use flow::{CallbackAction, CallbackEvent, FlowController, TextMessageEvent};
pub use game::GameService;
pub use localization::{Language, Localizer, MessageKey, StaticLocalizer};
pub use messenger::{Messenger, RecordingMessenger, SendOptions};
pub use shared::{AppError, AppState};
