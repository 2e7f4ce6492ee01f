use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument};

use crate::shared::AppError;

/// Well-known setting keys
pub mod keys {
    pub const BOT_TOKEN: &str = "bot_token";
    pub const BOT_USERNAME: &str = "bot_username";
    pub const CONSOLE_LANGUAGE: &str = "console_language";
}

/// Flat key-value settings area (transport token, bot username, console
/// language). Not interpreted by the game core itself.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, AppError>;

    /// Atomic upsert
    async fn set_setting(&self, key: &str, value: &str) -> Result<(), AppError>;
}

/// In-memory implementation of SettingsRepository for development and testing
pub struct InMemorySettingsRepository {
    settings: Mutex<HashMap<String, String>>,
}

impl Default for InMemorySettingsRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySettingsRepository {
    pub fn new() -> Self {
        Self {
            settings: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    #[instrument(skip(self))]
    async fn get_setting(&self, key: &str) -> Result<Option<String>, AppError> {
        let settings = self.settings.lock().unwrap();
        Ok(settings.get(key).cloned())
    }

    #[instrument(skip(self, value))]
    async fn set_setting(&self, key: &str, value: &str) -> Result<(), AppError> {
        debug!(key = %key, "Storing setting in memory");

        let mut settings = self.settings.lock().unwrap();
        settings.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// PostgreSQL implementation of settings storage
pub struct PostgresSettingsRepository {
    pool: PgPool,
}

impl PostgresSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PostgresSettingsRepository {
    #[instrument(skip(self))]
    async fn get_setting(&self, key: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row.try_get("value"))
            .transpose()
            .map_err(AppError::from)
    }

    #[instrument(skip(self, value))]
    async fn set_setting(&self, key: &str, value: &str) -> Result<(), AppError> {
        debug!(key = %key, "Storing setting in database");

        sqlx::query(
            r#"
            INSERT INTO settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key)
            DO UPDATE SET value = $2
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
