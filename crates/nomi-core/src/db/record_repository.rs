//! Drinking record repository implementation

use crate::db::connection::{begin, finish};
use crate::error::{Error, Result};
use crate::models::{DrinkingRecord, NewRecord, RecordId, RecordPatch};
use libsql::params::IntoParams;
use libsql::{params, Connection, Row};

const RECORD_COLUMNS: &str =
    "id, date, name, drink_type, percentage, amount_ml, created_at, updated_at, deleted, synced";

/// The exact version of a record that the remote acknowledged.
///
/// Marking is keyed on `updated_at` too, so an edit that landed while the
/// push was in flight stays unsynced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushedVersion {
    pub id: RecordId,
    pub updated_at: String,
}

impl From<&DrinkingRecord> for PushedVersion {
    fn from(record: &DrinkingRecord) -> Self {
        Self {
            id: record.id.clone(),
            updated_at: record.updated_at.clone(),
        }
    }
}

/// Decides whether an incoming record replaces the local one `(local, incoming)`.
pub type MergeRule = fn(&DrinkingRecord, &DrinkingRecord) -> bool;

/// Trait for drinking record storage operations (async)
#[allow(async_fn_in_trait)]
pub trait RecordRepository {
    /// Create a new record from user input
    async fn create(&self, input: NewRecord) -> Result<DrinkingRecord>;

    /// Get a record by ID, including soft-deleted ones
    async fn get(&self, id: &RecordId) -> Result<Option<DrinkingRecord>>;

    /// List records newest day first
    async fn list(&self, include_deleted: bool) -> Result<Vec<DrinkingRecord>>;

    /// List non-deleted records for one logical day
    async fn list_by_date(&self, date: &str) -> Result<Vec<DrinkingRecord>>;

    /// List non-deleted records with `from <= date <= to`
    async fn list_between(&self, from: &str, to: &str) -> Result<Vec<DrinkingRecord>>;

    /// Apply field edits to a live record
    async fn update(&self, id: &RecordId, patch: RecordPatch) -> Result<DrinkingRecord>;

    /// Soft delete a record
    async fn delete(&self, id: &RecordId) -> Result<DrinkingRecord>;

    /// Every record the remote does not hold yet, deletions included
    async fn list_unsynced(&self) -> Result<Vec<DrinkingRecord>>;

    /// Number of unsynced records
    async fn count_unsynced(&self) -> Result<usize>;

    /// Mark pushed versions synced in one transaction
    async fn mark_synced(&self, versions: &[PushedVersion]) -> Result<usize>;

    /// Insert unknown records and replace known ones where `rule` says so,
    /// all in one transaction. Written records are marked synced.
    async fn merge_remote(&self, incoming: &[DrinkingRecord], rule: MergeRule) -> Result<usize>;

    /// Insert or overwrite by id without any merge rule, in one transaction
    async fn upsert_all(&self, records: &[DrinkingRecord]) -> Result<usize>;

    /// Physically remove every record
    async fn clear(&self) -> Result<u64>;
}

/// libSQL implementation of `RecordRepository`
pub struct LibSqlRecordRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlRecordRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a record from a database row
    fn parse_record(row: &Row) -> Result<DrinkingRecord> {
        let id: String = row.get(0)?;
        Ok(DrinkingRecord {
            id: id.parse()?,
            date: row.get(1)?,
            name: row.get(2)?,
            drink_type: row.get(3)?,
            percentage: row.get(4)?,
            amount_ml: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
            deleted: row.get::<i32>(8)? != 0,
            synced: row.get::<i32>(9)? != 0,
        })
    }

    async fn query_records(
        &self,
        sql: &str,
        params: impl IntoParams,
    ) -> Result<Vec<DrinkingRecord>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::parse_record(&row)?);
        }
        Ok(records)
    }

    /// Insert or replace the full row for `record`
    async fn write(&self, record: &DrinkingRecord) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT OR REPLACE INTO records ({RECORD_COLUMNS})
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ),
                params![
                    record.id.as_str(),
                    record.date.as_str(),
                    record.name.as_str(),
                    record.drink_type.as_str(),
                    record.percentage,
                    record.amount_ml,
                    record.created_at.as_str(),
                    record.updated_at.as_str(),
                    i32::from(record.deleted),
                    i32::from(record.synced)
                ],
            )
            .await?;
        Ok(())
    }

    async fn get_live(&self, id: &RecordId) -> Result<DrinkingRecord> {
        match self.get(id).await? {
            Some(record) if !record.deleted => Ok(record),
            _ => Err(Error::NotFound(id.to_string())),
        }
    }

    async fn merge_remote_inner(
        &self,
        incoming: &[DrinkingRecord],
        rule: MergeRule,
    ) -> Result<usize> {
        let mut merged = 0;
        for remote in incoming {
            let replace = match self.get(&remote.id).await? {
                None => true,
                Some(local) => rule(&local, remote),
            };
            if replace {
                let mut record = remote.clone();
                record.synced = true;
                self.write(&record).await?;
                merged += 1;
            }
        }
        Ok(merged)
    }

    async fn mark_synced_inner(&self, versions: &[PushedVersion]) -> Result<usize> {
        let mut marked = 0;
        for version in versions {
            let rows = self
                .conn
                .execute(
                    "UPDATE records SET synced = 1 WHERE id = ? AND updated_at = ?",
                    params![version.id.as_str(), version.updated_at.as_str()],
                )
                .await?;
            if rows > 0 {
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn upsert_all_inner(&self, records: &[DrinkingRecord]) -> Result<usize> {
        for record in records {
            self.write(record).await?;
        }
        Ok(records.len())
    }
}

impl RecordRepository for LibSqlRecordRepository<'_> {
    async fn create(&self, input: NewRecord) -> Result<DrinkingRecord> {
        let record = DrinkingRecord::new(input)?;
        self.write(&record).await?;
        Ok(record)
    }

    async fn get(&self, id: &RecordId) -> Result<Option<DrinkingRecord>> {
        let records = self
            .query_records(
                &format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?"),
                params![id.as_str()],
            )
            .await?;
        Ok(records.into_iter().next())
    }

    async fn list(&self, include_deleted: bool) -> Result<Vec<DrinkingRecord>> {
        let filter = if include_deleted {
            ""
        } else {
            "WHERE deleted = 0"
        };
        self.query_records(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM records {filter}
                 ORDER BY date DESC, created_at DESC"
            ),
            (),
        )
        .await
    }

    async fn list_by_date(&self, date: &str) -> Result<Vec<DrinkingRecord>> {
        self.query_records(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM records
                 WHERE date = ? AND deleted = 0
                 ORDER BY created_at DESC"
            ),
            params![date],
        )
        .await
    }

    async fn list_between(&self, from: &str, to: &str) -> Result<Vec<DrinkingRecord>> {
        self.query_records(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM records
                 WHERE date >= ? AND date <= ? AND deleted = 0
                 ORDER BY date DESC, created_at DESC"
            ),
            params![from, to],
        )
        .await
    }

    async fn update(&self, id: &RecordId, patch: RecordPatch) -> Result<DrinkingRecord> {
        let mut record = self.get_live(id).await?;
        record.apply_patch(patch)?;
        self.write(&record).await?;
        Ok(record)
    }

    async fn delete(&self, id: &RecordId) -> Result<DrinkingRecord> {
        let mut record = self.get_live(id).await?;
        record.soft_delete();
        self.write(&record).await?;
        Ok(record)
    }

    async fn list_unsynced(&self) -> Result<Vec<DrinkingRecord>> {
        self.query_records(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM records
                 WHERE synced = 0
                 ORDER BY updated_at ASC"
            ),
            (),
        )
        .await
    }

    async fn count_unsynced(&self) -> Result<usize> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM records WHERE synced = 0", ())
            .await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn mark_synced(&self, versions: &[PushedVersion]) -> Result<usize> {
        if versions.is_empty() {
            return Ok(0);
        }
        begin(self.conn).await?;
        let outcome = self.mark_synced_inner(versions).await;
        finish(self.conn, outcome).await
    }

    async fn merge_remote(&self, incoming: &[DrinkingRecord], rule: MergeRule) -> Result<usize> {
        if incoming.is_empty() {
            return Ok(0);
        }
        begin(self.conn).await?;
        let outcome = self.merge_remote_inner(incoming, rule).await;
        finish(self.conn, outcome).await
    }

    async fn upsert_all(&self, records: &[DrinkingRecord]) -> Result<usize> {
        begin(self.conn).await?;
        let outcome = self.upsert_all_inner(records).await;
        finish(self.conn, outcome).await
    }

    async fn clear(&self) -> Result<u64> {
        Ok(self.conn.execute("DELETE FROM records", ()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn input(date: &str, amount_ml: f64) -> NewRecord {
        NewRecord {
            date: date.to_string(),
            name: "Sapporo".to_string(),
            drink_type: "beer".to_string(),
            percentage: 5.0,
            amount_ml,
        }
    }

    fn newer_wins(local: &DrinkingRecord, incoming: &DrinkingRecord) -> bool {
        incoming.updated_at > local.updated_at
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_and_get() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        let record = repo.create(input("2026-02-18", 350.0)).await.unwrap();
        let fetched = repo.get(&record.id).await.unwrap().unwrap();

        assert_eq!(fetched, record);
        assert!(!fetched.synced);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_by_date_and_range() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        repo.create(input("2026-02-17", 350.0)).await.unwrap();
        repo.create(input("2026-02-18", 350.0)).await.unwrap();
        repo.create(input("2026-02-18", 500.0)).await.unwrap();
        repo.create(input("2026-02-20", 500.0)).await.unwrap();

        assert_eq!(repo.list_by_date("2026-02-18").await.unwrap().len(), 2);
        let range = repo.list_between("2026-02-17", "2026-02-18").await.unwrap();
        assert_eq!(range.len(), 3);
        assert_eq!(range[0].date, "2026-02-18");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_resets_synced() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        let record = repo.create(input("2026-02-18", 350.0)).await.unwrap();
        repo.mark_synced(&[PushedVersion::from(&record)])
            .await
            .unwrap();

        let updated = repo
            .update(
                &record.id,
                RecordPatch {
                    amount_ml: Some(500.0),
                    ..RecordPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.amount_ml, 500.0);
        assert!(!updated.synced);
        assert!(updated.updated_at > record.updated_at);
        assert_eq!(repo.count_unsynced().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_is_soft() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        let record = repo.create(input("2026-02-18", 350.0)).await.unwrap();
        repo.delete(&record.id).await.unwrap();

        assert!(repo.list(false).await.unwrap().is_empty());
        let kept = repo.get(&record.id).await.unwrap().unwrap();
        assert!(kept.deleted);

        let unsynced = repo.list_unsynced().await.unwrap();
        assert_eq!(unsynced.len(), 1);
        assert!(unsynced[0].deleted);

        // Deleting twice is a not-found
        assert!(matches!(
            repo.delete(&record.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mark_synced_skips_records_edited_since_push() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        let first = repo.create(input("2026-02-18", 350.0)).await.unwrap();
        let second = repo.create(input("2026-02-18", 500.0)).await.unwrap();
        let pushed = vec![PushedVersion::from(&first), PushedVersion::from(&second)];

        repo.update(
            &second.id,
            RecordPatch {
                name: Some("Edited mid-push".to_string()),
                ..RecordPatch::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(repo.mark_synced(&pushed).await.unwrap(), 1);
        let unsynced = repo.list_unsynced().await.unwrap();
        assert_eq!(unsynced.len(), 1);
        assert_eq!(unsynced[0].id, second.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_merge_remote_applies_rule() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        let local = repo.create(input("2026-02-18", 350.0)).await.unwrap();

        let mut stale = local.clone();
        stale.amount_ml = 1.0;
        stale.updated_at = "2000-01-01T00:00:00.000Z".to_string();

        let mut unknown = DrinkingRecord::new(input("2026-02-19", 180.0)).unwrap();
        unknown.synced = false;

        let merged = repo
            .merge_remote(&[stale, unknown.clone()], newer_wins)
            .await
            .unwrap();

        assert_eq!(merged, 1);
        assert_eq!(repo.get(&local.id).await.unwrap().unwrap().amount_ml, 350.0);
        assert!(repo.get(&unknown.id).await.unwrap().unwrap().synced);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_all_overwrites_without_rule() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        let local = repo.create(input("2026-02-18", 350.0)).await.unwrap();
        let mut older = local.clone();
        older.amount_ml = 700.0;
        older.updated_at = "2000-01-01T00:00:00.000Z".to_string();

        assert_eq!(repo.upsert_all(&[older]).await.unwrap(), 1);
        assert_eq!(repo.get(&local.id).await.unwrap().unwrap().amount_ml, 700.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_clear_removes_everything() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        repo.create(input("2026-02-18", 350.0)).await.unwrap();
        repo.create(input("2026-02-19", 350.0)).await.unwrap();

        assert_eq!(repo.clear().await.unwrap(), 2);
        assert!(repo.list(true).await.unwrap().is_empty());
    }
}
