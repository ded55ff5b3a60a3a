//! Settings repository implementation
//!
//! Every key holds one JSON document as text. Blobs are replaced wholesale.

use crate::db::connection::{begin, finish};
use crate::error::Result;
use crate::models::{
    SettingsSnapshot, KEY_COLOR_THRESHOLDS, KEY_DEFAULT_TYPE_ID, KEY_DRINK_TYPES,
    KEY_VOLUME_PRESETS,
};
use libsql::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Trait for settings storage operations (async)
#[allow(async_fn_in_trait)]
pub trait SettingsRepository {
    /// Raw stored JSON text for `key`
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;

    /// Store raw JSON text under `key`
    async fn set_raw(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`, falling back to its default
    async fn remove(&self, key: &str) -> Result<()>;

    /// Store several blobs in one transaction
    async fn replace_many(&self, entries: &[(String, String)]) -> Result<()>;

    /// Load the effective synchronized settings, defaults filled in
    async fn load(&self) -> Result<SettingsSnapshot>;

    /// Save all synchronized settings
    async fn save(&self, settings: &SettingsSnapshot) -> Result<()>;
}

/// libSQL implementation of `SettingsRepository`
pub struct LibSqlSettingsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSettingsRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Decode a stored blob; unreadable blobs count as unset.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.get_raw(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                tracing::warn!("Ignoring unreadable setting {key}: {error}");
                Ok(None)
            }
        }
    }

    /// Encode and store a blob.
    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, &raw).await
    }

    /// Default drink type id; older stores kept it as bare text.
    async fn default_type_id(&self) -> Result<Option<String>> {
        let Some(raw) = self.get_raw(KEY_DEFAULT_TYPE_ID).await? else {
            return Ok(None);
        };
        let id = serde_json::from_str::<String>(&raw).unwrap_or(raw);
        Ok(Some(id).filter(|id| !id.trim().is_empty()))
    }

    async fn replace_many_inner(&self, entries: &[(String, String)]) -> Result<()> {
        for (key, value) in entries {
            self.set_raw(key, value).await?;
        }
        Ok(())
    }
}

impl SettingsRepository for LibSqlSettingsRepository<'_> {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM settings WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let value: String = row.get(0)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    async fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?", [key])
            .await?;
        Ok(())
    }

    async fn replace_many(&self, entries: &[(String, String)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        begin(self.conn).await?;
        let outcome = self.replace_many_inner(entries).await;
        finish(self.conn, outcome).await
    }

    async fn load(&self) -> Result<SettingsSnapshot> {
        let mut settings = SettingsSnapshot::default();

        if let Some(presets) = self.get_json(KEY_VOLUME_PRESETS).await? {
            settings.volume_presets = presets;
        }
        if let Some(thresholds) = self.get_json(KEY_COLOR_THRESHOLDS).await? {
            settings.thresholds = thresholds;
        }
        if let Some(drink_types) = self.get_json(KEY_DRINK_TYPES).await? {
            settings.drink_types = drink_types;
        }
        if let Some(id) = self.default_type_id().await? {
            settings.default_type_id = id;
        }

        Ok(settings)
    }

    async fn save(&self, settings: &SettingsSnapshot) -> Result<()> {
        let entries = vec![
            (
                KEY_VOLUME_PRESETS.to_string(),
                serde_json::to_string(&settings.volume_presets)?,
            ),
            (
                KEY_COLOR_THRESHOLDS.to_string(),
                serde_json::to_string(&settings.thresholds)?,
            ),
            (
                KEY_DRINK_TYPES.to_string(),
                serde_json::to_string(&settings.drink_types)?,
            ),
            (
                KEY_DEFAULT_TYPE_ID.to_string(),
                serde_json::to_string(&settings.default_type_id)?,
            ),
        ];
        self.replace_many(&entries).await
    }
}
