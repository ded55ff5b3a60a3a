//! Shared database service wrapper used by the sync engine and clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    Database, LibSqlRecordRepository, LibSqlSettingsRepository, MergeRule, PushedVersion,
    RecordRepository, SettingsRepository,
};
use crate::models::{DrinkingRecord, NewRecord, RecordId, RecordPatch, SettingsSnapshot};
use crate::Result;

/// Thread-safe service for DB and repository operations.
///
/// Every call holds the connection lock for its whole duration, so a
/// multi-record transaction is never observed half applied.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::debug!("Opening local store at {}", db_path.display());
        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory database service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Filesystem location, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Create a new record.
    pub async fn create_record(&self, input: NewRecord) -> Result<DrinkingRecord> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.create(input).await
    }

    /// Fetch a record by id, soft-deleted ones included.
    pub async fn get_record(&self, id: &RecordId) -> Result<Option<DrinkingRecord>> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.get(id).await
    }

    /// List records newest day first.
    pub async fn list_records(&self, include_deleted: bool) -> Result<Vec<DrinkingRecord>> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.list(include_deleted).await
    }

    /// List live records for one logical day.
    pub async fn list_records_by_date(&self, date: &str) -> Result<Vec<DrinkingRecord>> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.list_by_date(date).await
    }

    /// List live records in an inclusive date range.
    pub async fn list_records_between(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Vec<DrinkingRecord>> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.list_between(from, to).await
    }

    /// Edit a record.
    pub async fn update_record(
        &self,
        id: &RecordId,
        patch: RecordPatch,
    ) -> Result<DrinkingRecord> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.update(id, patch).await
    }

    /// Soft-delete a record.
    pub async fn delete_record(&self, id: &RecordId) -> Result<DrinkingRecord> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.delete(id).await
    }

    /// Records not yet held by the remote.
    pub async fn list_unsynced(&self) -> Result<Vec<DrinkingRecord>> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.list_unsynced().await
    }

    /// Number of records not yet held by the remote.
    pub async fn count_unsynced(&self) -> Result<usize> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.count_unsynced().await
    }

    /// Mark pushed versions synced, atomically.
    pub async fn mark_synced(&self, versions: &[PushedVersion]) -> Result<usize> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.mark_synced(versions).await
    }

    /// Merge a batch of remote records under `rule`, atomically.
    pub async fn merge_remote(&self, incoming: &[DrinkingRecord], rule: MergeRule) -> Result<usize> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.merge_remote(incoming, rule).await
    }

    /// Overwrite records by id, atomically.
    pub async fn upsert_records(&self, records: &[DrinkingRecord]) -> Result<usize> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.upsert_all(records).await
    }

    /// Physically remove every record.
    pub async fn clear_records(&self) -> Result<u64> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.clear().await
    }

    /// Load effective synchronized settings.
    pub async fn load_settings(&self) -> Result<SettingsSnapshot> {
        let db = self.db.lock().await;
        let repo = LibSqlSettingsRepository::new(db.connection());
        repo.load().await
    }

    /// Save all synchronized settings.
    pub async fn save_settings(&self, settings: &SettingsSnapshot) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlSettingsRepository::new(db.connection());
        repo.save(settings).await
    }

    /// Raw stored JSON for a settings key.
    pub async fn get_setting_raw(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().await;
        let repo = LibSqlSettingsRepository::new(db.connection());
        repo.get_raw(key).await
    }

    /// Decoded settings blob, `None` when unset or unreadable.
    pub async fn get_setting<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>> {
        let db = self.db.lock().await;
        let repo = LibSqlSettingsRepository::new(db.connection());
        repo.get_json(key).await
    }

    /// Encode and store a settings blob.
    pub async fn set_setting<T: serde::Serialize + ?Sized + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlSettingsRepository::new(db.connection());
        repo.set_json(key, value).await
    }

    /// Remove a settings key.
    pub async fn remove_setting(&self, key: &str) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlSettingsRepository::new(db.connection());
        repo.remove(key).await
    }

    /// Store several raw settings blobs, atomically.
    pub async fn replace_settings(&self, entries: &[(String, String)]) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlSettingsRepository::new(db.connection());
        repo.replace_many(entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KEY_LAST_SYNC, SettingsSnapshot};
    use tempfile::tempdir;

    fn beer() -> NewRecord {
        NewRecord {
            date: "2026-02-18".to_string(),
            name: String::new(),
            drink_type: "beer".to_string(),
            percentage: 5.0,
            amount_ml: 350.0,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn in_memory_create_and_list_roundtrip() {
        let service = DatabaseService::open_in_memory().await.unwrap();

        service.create_record(beer()).await.unwrap();
        let records = service.list_records(false).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount_ml, 350.0);
        assert_eq!(service.count_unsynced().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn open_path_creates_parent_directories() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("nomi.db");

        let service = DatabaseService::open_path(&db_path).await.unwrap();
        service.create_record(beer()).await.unwrap();

        assert_eq!(service.path(), Some(db_path.as_path()));
        assert!(db_path.exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn typed_settings_roundtrip() {
        let service = DatabaseService::open_in_memory().await.unwrap();

        service
            .set_setting(KEY_LAST_SYNC, "2026-02-18T00:00:00.000Z")
            .await
            .unwrap();
        let stored: Option<String> = service.get_setting(KEY_LAST_SYNC).await.unwrap();
        assert_eq!(stored.as_deref(), Some("2026-02-18T00:00:00.000Z"));

        service.remove_setting(KEY_LAST_SYNC).await.unwrap();
        let cleared: Option<String> = service.get_setting(KEY_LAST_SYNC).await.unwrap();
        assert!(cleared.is_none());

        assert_eq!(
            service.load_settings().await.unwrap(),
            SettingsSnapshot::default()
        );
    }
}
