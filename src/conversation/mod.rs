// Public API - what other modules can use
pub use cache::StateCache;
pub use state::{ConversationState, PostLanguageAction};

pub mod cache;
pub mod repository;
pub mod state;
