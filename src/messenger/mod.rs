use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Rich-text mode for an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    #[default]
    Plain,
    Html,
}

/// One inline button: a label plus the callback data sent back on tap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Presentation options for an outbound message
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub format: TextFormat,
    /// Inline keyboard rows attached to the message
    pub buttons: Vec<Vec<Button>>,
    /// Reply keyboard labels (the persistent menu)
    pub menu_labels: Vec<String>,
}

impl SendOptions {
    pub fn html() -> Self {
        Self {
            format: TextFormat::Html,
            ..Default::default()
        }
    }

    pub fn with_buttons(mut self, buttons: Vec<Vec<Button>>) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn with_menu(mut self, labels: Vec<String>) -> Self {
        self.menu_labels = labels;
        self
    }
}

/// Outbound chat transport seam.
///
/// The core treats delivery as fire-and-forget: it never retries a failed
/// send and never blocks subsequent logic on delivery confirmation. Adapters
/// log their own failures.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, user_id: i64, text: &str, options: SendOptions);

    async fn delete_message(&self, user_id: i64, message_id: i64);

    async fn acknowledge_callback(&self, callback_id: &str, text: Option<&str>, show_alert: bool);
}

/// A recorded outbound message
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub user_id: i64,
    pub text: String,
    pub options: SendOptions,
}

/// A recorded callback acknowledgement
#[derive(Debug, Clone)]
pub struct CallbackAck {
    pub callback_id: String,
    pub text: Option<String>,
    pub show_alert: bool,
}

/// Messenger that records all outbound traffic, for tests and local runs
#[derive(Clone, Default)]
pub struct RecordingMessenger {
    messages: Arc<RwLock<Vec<SentMessage>>>,
    acks: Arc<RwLock<Vec<CallbackAck>>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages_for(&self, user_id: i64) -> Vec<SentMessage> {
        self.messages
            .read()
            .await
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn texts_for(&self, user_id: i64) -> Vec<String> {
        self.messages_for(user_id)
            .await
            .into_iter()
            .map(|m| m.text)
            .collect()
    }

    pub async fn last_text_for(&self, user_id: i64) -> Option<String> {
        self.texts_for(user_id).await.pop()
    }

    pub async fn all_messages(&self) -> Vec<SentMessage> {
        self.messages.read().await.clone()
    }

    pub async fn acks(&self) -> Vec<CallbackAck> {
        self.acks.read().await.clone()
    }

    pub async fn clear(&self) {
        self.messages.write().await.clear();
        self.acks.write().await.clear();
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, user_id: i64, text: &str, options: SendOptions) {
        self.messages.write().await.push(SentMessage {
            user_id,
            text: text.to_string(),
            options,
        });
    }

    async fn delete_message(&self, _user_id: i64, _message_id: i64) {}

    async fn acknowledge_callback(&self, callback_id: &str, text: Option<&str>, show_alert: bool) {
        self.acks.write().await.push(CallbackAck {
            callback_id: callback_id.to_string(),
            text: text.map(|t| t.to_string()),
            show_alert,
        });
    }
}

/// Messenger that only logs outbound traffic. Default for local runs where
/// no transport adapter is attached.
pub struct LoggingMessenger;

#[async_trait]
impl Messenger for LoggingMessenger {
    async fn send_text(&self, user_id: i64, text: &str, _options: SendOptions) {
        info!(user_id = user_id, text = %text, "Outbound message");
    }

    async fn delete_message(&self, user_id: i64, message_id: i64) {
        info!(user_id = user_id, message_id = message_id, "Delete message");
    }

    async fn acknowledge_callback(&self, callback_id: &str, text: Option<&str>, show_alert: bool) {
        info!(
            callback_id = %callback_id,
            text = ?text,
            show_alert = show_alert,
            "Callback acknowledged"
        );
    }
}
