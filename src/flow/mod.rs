// Public API - what other modules can use
pub use controller::FlowController;
pub use events::{CallbackAction, CallbackEvent, TextMessageEvent};

mod controller;
pub mod events;
mod lifecycle;
pub mod render;
