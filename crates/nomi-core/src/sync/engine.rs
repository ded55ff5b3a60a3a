//! Push/pull reconciliation between the local store and the remote.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use super::client::{RemoteClient, RemoteOutcome, SyncTransport};
use super::error::SyncResult;
use super::protocol::decode_remote_record;
use crate::config::SyncConfig;
use crate::db::PushedVersion;
use crate::models::{
    AllThresholds, DrinkType, DrinkingRecord, SettingsSnapshot, VolumePreset,
    KEY_COLOR_THRESHOLDS, KEY_DEFAULT_TYPE_ID, KEY_DRINK_TYPES, KEY_LAST_SYNC,
    KEY_VOLUME_PRESETS, SYNCED_SETTING_KEYS,
};
use crate::services::DatabaseService;
use crate::util::{now_iso, parse_iso_timestamp};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushReport {
    /// Records the remote reports as written.
    pub updated: usize,
    /// Records sent.
    pub sent: usize,
    /// Records marked synced locally.
    pub marked: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullReport {
    /// Records inserted or overwritten locally.
    pub merged: usize,
    /// Rows the remote returned.
    pub received: usize,
    /// Rows dropped because they could not be decoded.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsReport {
    pub updated: usize,
}

/// Compare two `updatedAt` values as instants, falling back to string order
/// when either fails to parse.
pub fn compare_updated_at(left: &str, right: &str) -> Ordering {
    match (parse_iso_timestamp(left), parse_iso_timestamp(right)) {
        (Some(left), Some(right)) => left.cmp(&right),
        _ => left.cmp(right),
    }
}

/// Merge rule for pulls: the remote copy replaces the local one only when
/// it is strictly newer. Ties keep the local copy.
pub fn remote_wins(local: &DrinkingRecord, incoming: &DrinkingRecord) -> bool {
    compare_updated_at(&incoming.updated_at, &local.updated_at) == Ordering::Greater
}

/// Reconciles one local store with one remote.
///
/// Every operation is a silent no-op while the config has no endpoint.
pub struct SyncEngine<T> {
    client: RemoteClient<T>,
    store: DatabaseService,
    config: Mutex<SyncConfig>,
}

impl<T: SyncTransport> SyncEngine<T> {
    pub fn new(transport: T, store: DatabaseService, config: SyncConfig) -> Self {
        let client = RemoteClient::new(transport, config.required_version.clone());
        Self {
            client,
            store,
            config: Mutex::new(config),
        }
    }

    pub const fn store(&self) -> &DatabaseService {
        &self.store
    }

    pub const fn client(&self) -> &RemoteClient<T> {
        &self.client
    }

    pub async fn config(&self) -> SyncConfig {
        self.config.lock().await.clone()
    }

    pub async fn is_configured(&self) -> bool {
        self.config.lock().await.is_configured()
    }

    pub async fn last_sync_at(&self) -> Option<String> {
        self.config.lock().await.last_sync_at.clone()
    }

    /// Send every unsynced record, then mark what the remote stored.
    pub async fn push_records(&self) -> SyncResult<RemoteOutcome<PushReport>> {
        if !self.is_configured().await {
            tracing::debug!("Skipping record push: endpoint not configured");
            return Ok(RemoteOutcome::Applied(PushReport::default()));
        }

        let unsynced = self.store.list_unsynced().await?;
        if unsynced.is_empty() {
            return Ok(RemoteOutcome::Applied(PushReport::default()));
        }

        let ack = match self.client.save_records(&unsynced).await? {
            RemoteOutcome::Applied(ack) => ack,
            RemoteOutcome::UpdateRequired(mismatch) => {
                return Ok(RemoteOutcome::UpdateRequired(mismatch))
            }
        };

        let versions = match &ack.saved_ids {
            Some(ids) => {
                let saved: HashSet<&str> = ids.iter().map(String::as_str).collect();
                unsynced
                    .iter()
                    .filter(|record| saved.contains(record.id.as_str()))
                    .map(PushedVersion::from)
                    .collect::<Vec<_>>()
            }
            None => unsynced.iter().map(PushedVersion::from).collect(),
        };
        let marked = self.store.mark_synced(&versions).await?;
        self.record_sync_time().await?;

        let report = PushReport {
            updated: ack
                .updated
                .and_then(|updated| usize::try_from(updated).ok())
                .unwrap_or(unsynced.len()),
            sent: unsynced.len(),
            marked,
        };
        tracing::info!(
            "Pushed {} records ({} reported written, {} marked synced)",
            report.sent,
            report.updated,
            report.marked
        );
        Ok(RemoteOutcome::Applied(report))
    }

    /// Fetch records touched at or after `since` (everything when `None`)
    /// and merge them last-writer-wins.
    pub async fn pull_records(&self, since: Option<&str>) -> SyncResult<RemoteOutcome<PullReport>> {
        let config = self.config().await;
        if !config.is_configured() {
            tracing::debug!("Skipping record pull: endpoint not configured");
            return Ok(RemoteOutcome::Applied(PullReport::default()));
        }

        let rows = match self.client.get_records(since).await? {
            RemoteOutcome::Applied(rows) => rows,
            RemoteOutcome::UpdateRequired(mismatch) => {
                return Ok(RemoteOutcome::UpdateRequired(mismatch))
            }
        };

        let received = rows.len();
        let mut incoming = Vec::with_capacity(received);
        for row in rows {
            match decode_remote_record(row, config.date_offset) {
                Ok(record) => incoming.push(record),
                Err(reason) => tracing::warn!("Skipping remote record: {reason}"),
            }
        }
        let skipped = received - incoming.len();

        let merged = if incoming.is_empty() {
            0
        } else {
            self.store.merge_remote(&incoming, remote_wins).await?
        };
        self.record_sync_time().await?;

        tracing::info!("Pulled {received} records, merged {merged}");
        Ok(RemoteOutcome::Applied(PullReport {
            merged,
            received,
            skipped,
        }))
    }

    /// Send the effective value of every synchronized settings key.
    pub async fn push_settings(&self) -> SyncResult<RemoteOutcome<SettingsReport>> {
        if !self.is_configured().await {
            return Ok(RemoteOutcome::Applied(SettingsReport::default()));
        }

        let snapshot = self.store.load_settings().await?;
        let payload = settings_payload(&snapshot)?;
        let outcome = self.client.save_settings(&payload).await?;
        Ok(outcome.map(|updated| SettingsReport {
            updated: usize::try_from(updated).unwrap_or(usize::MAX),
        }))
    }

    /// Replace each local setting whose effective value differs from the
    /// remote one. Key order and `20` vs `20.0` do not count as changes.
    pub async fn pull_settings(&self) -> SyncResult<RemoteOutcome<SettingsReport>> {
        if !self.is_configured().await {
            return Ok(RemoteOutcome::Applied(SettingsReport::default()));
        }

        let remote = match self.client.get_settings().await? {
            RemoteOutcome::Applied(remote) => remote,
            RemoteOutcome::UpdateRequired(mismatch) => {
                return Ok(RemoteOutcome::UpdateRequired(mismatch))
            }
        };

        let local = settings_payload(&self.store.load_settings().await?)?;
        let mut changes = Vec::new();
        for key in SYNCED_SETTING_KEYS {
            let Some(value) = remote.get(key).filter(|value| is_present(value)) else {
                continue;
            };
            if !fits_setting(key, value) {
                tracing::warn!("Ignoring remote setting {key}: unexpected shape");
                continue;
            }
            if local.get(key).is_some_and(|current| same_json(current, value)) {
                continue;
            }
            let serialized = serde_json::to_string(value).map_err(crate::Error::from)?;
            changes.push((key.to_string(), serialized));
        }

        self.store.replace_settings(&changes).await?;
        if !changes.is_empty() {
            tracing::info!("Pulled {} settings", changes.len());
        }
        Ok(RemoteOutcome::Applied(SettingsReport {
            updated: changes.len(),
        }))
    }

    async fn record_sync_time(&self) -> SyncResult<()> {
        let now = now_iso();
        self.store.set_setting(KEY_LAST_SYNC, now.as_str()).await?;
        self.config.lock().await.last_sync_at = Some(now);
        Ok(())
    }
}

/// Remote payload for a settings push.
pub fn settings_payload(snapshot: &SettingsSnapshot) -> crate::Result<Map<String, Value>> {
    let mut payload = Map::new();
    payload.insert(
        KEY_VOLUME_PRESETS.to_string(),
        serde_json::to_value(&snapshot.volume_presets)?,
    );
    payload.insert(
        KEY_COLOR_THRESHOLDS.to_string(),
        serde_json::to_value(snapshot.thresholds)?,
    );
    payload.insert(
        KEY_DRINK_TYPES.to_string(),
        serde_json::to_value(&snapshot.drink_types)?,
    );
    payload.insert(
        KEY_DEFAULT_TYPE_ID.to_string(),
        Value::String(snapshot.default_type_id.clone()),
    );
    Ok(payload)
}

/// Structural JSON equality: object key order is ignored and numbers
/// compare by value.
fn same_json(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left.as_f64() == right.as_f64(),
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len() && left.iter().zip(right).all(|(l, r)| same_json(l, r))
        }
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .all(|(key, l)| right.get(key).is_some_and(|r| same_json(l, r)))
        }
        _ => left == right,
    }
}

// Empty strings, zero, false and null mean the remote has no value.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn fits_setting(key: &str, value: &Value) -> bool {
    match key {
        KEY_VOLUME_PRESETS => Vec::<VolumePreset>::deserialize(value).is_ok(),
        KEY_COLOR_THRESHOLDS => AllThresholds::deserialize(value).is_ok(),
        KEY_DRINK_TYPES => Vec::<DrinkType>::deserialize(value).is_ok(),
        KEY_DEFAULT_TYPE_ID => value.is_string(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColorThresholds, NewRecord, RecordPatch, DEFAULT_TYPE_ID};
    use crate::sync::testing::{Failure, MemoryRemote};
    use crate::sync::SyncError;
    use crate::util::to_iso_timestamp;
    use chrono::{Duration, FixedOffset};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn config() -> SyncConfig {
        SyncConfig {
            date_offset: FixedOffset::east_opt(0).unwrap(),
            ..SyncConfig::for_endpoint("https://script.example.com/exec").unwrap()
        }
    }

    async fn engine(remote: &MemoryRemote) -> SyncEngine<MemoryRemote> {
        let store = DatabaseService::open_in_memory().await.unwrap();
        SyncEngine::new(remote.clone(), store, config())
    }

    fn beer(date: &str) -> NewRecord {
        NewRecord {
            date: date.to_string(),
            name: "Lager".to_string(),
            drink_type: "beer".to_string(),
            percentage: 5.0,
            amount_ml: 350.0,
        }
    }

    fn remote_row(id: &str, updated_at: &str, amount_ml: f64) -> Value {
        json!({
            "id": id,
            "date": "2026-02-18",
            "name": "Remote",
            "type": "sake",
            "percentage": 15,
            "amountMl": amount_ml,
            "createdAt": "2026-02-18T00:00:00.000Z",
            "updatedAt": updated_at,
            "deleted": false
        })
    }

    fn applied<T>(outcome: RemoteOutcome<T>) -> T {
        outcome.applied().expect("version gate passed")
    }

    #[test]
    fn remote_wins_only_when_strictly_newer() {
        let local = DrinkingRecord::new(beer("2026-02-18")).unwrap();
        let mut incoming = local.clone();

        incoming.updated_at = local.updated_at.clone();
        assert!(!remote_wins(&local, &incoming));

        let instant = parse_iso_timestamp(&local.updated_at).unwrap();
        incoming.updated_at = to_iso_timestamp(instant + Duration::milliseconds(1));
        assert!(remote_wins(&local, &incoming));

        incoming.updated_at = to_iso_timestamp(instant - Duration::milliseconds(1));
        assert!(!remote_wins(&local, &incoming));
    }

    #[test]
    fn compare_updated_at_uses_instants() {
        assert_eq!(
            compare_updated_at("2026-02-18T09:00:00+09:00", "2026-02-18T00:00:00.000Z"),
            Ordering::Equal
        );
        assert_eq!(compare_updated_at("b", "a"), Ordering::Greater);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unconfigured_engine_does_nothing() {
        let remote = MemoryRemote::default();
        let store = DatabaseService::open_in_memory().await.unwrap();
        store.create_record(beer("2026-02-18")).await.unwrap();
        let engine = SyncEngine::new(remote.clone(), store, SyncConfig::default());

        assert_eq!(applied(engine.push_records().await.unwrap()), PushReport::default());
        assert_eq!(applied(engine.pull_records(None).await.unwrap()), PullReport::default());
        assert_eq!(applied(engine.push_settings().await.unwrap()).updated, 0);
        assert_eq!(applied(engine.pull_settings().await.unwrap()).updated, 0);
        assert!(remote.requests().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn push_with_nothing_unsynced_makes_no_request() {
        let remote = MemoryRemote::default();
        let engine = engine(&remote).await;

        let report = applied(engine.push_records().await.unwrap());
        assert_eq!(report.updated, 0);
        assert!(remote.requests().is_empty());
        assert_eq!(engine.last_sync_at().await, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn push_sends_only_unsynced_records() {
        let remote = MemoryRemote::default();
        let engine = engine(&remote).await;
        let store = engine.store();

        let first = store.create_record(beer("2026-02-16")).await.unwrap();
        store
            .mark_synced(&[PushedVersion::from(&first)])
            .await
            .unwrap();
        store.create_record(beer("2026-02-17")).await.unwrap();
        store.create_record(beer("2026-02-18")).await.unwrap();

        let report = applied(engine.push_records().await.unwrap());

        let requests = remote.requests();
        assert_eq!(requests.len(), 1);
        let pushed = requests[0]["records"].as_array().unwrap();
        assert_eq!(pushed.len(), 2);
        assert!(pushed.iter().all(|record| record["id"] != first.id.as_str()));
        assert!(pushed.iter().all(|record| record.get("synced").is_none()));
        assert_eq!(report, PushReport { updated: 2, sent: 2, marked: 2 });
        assert_eq!(store.count_unsynced().await.unwrap(), 0);
        assert!(engine.last_sync_at().await.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn push_marks_only_ids_the_remote_saved() {
        let remote = MemoryRemote::default();
        let engine = engine(&remote).await;
        let store = engine.store();

        let kept = store.create_record(beer("2026-02-17")).await.unwrap();
        store.create_record(beer("2026-02-18")).await.unwrap();
        remote.report_saved_ids(&[kept.id.as_str()]);

        let report = applied(engine.push_records().await.unwrap());
        assert_eq!(report.marked, 1);

        let unsynced = store.list_unsynced().await.unwrap();
        assert_eq!(unsynced.len(), 1);
        assert_ne!(unsynced[0].id, kept.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_push_leaves_records_unsynced() {
        let remote = MemoryRemote::default();
        let engine = engine(&remote).await;
        engine.store().create_record(beer("2026-02-18")).await.unwrap();

        remote.fail_next(Failure::Status(500));
        let error = engine.push_records().await.unwrap_err();
        assert!(error.is_transport());

        remote.fail_next(Failure::Remote("quota exceeded".to_string()));
        let error = engine.push_records().await.unwrap_err();
        assert!(matches!(error, SyncError::Remote(message) if message == "quota exceeded"));

        assert_eq!(engine.store().count_unsynced().await.unwrap(), 1);
        assert_eq!(engine.last_sync_at().await, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stale_remote_blocks_push_and_pull() {
        let remote = MemoryRemote::default();
        remote.set_version("2020-01-01");
        remote.insert_record(remote_row("r1", "2026-02-18T12:00:00.000Z", 180.0));
        let engine = engine(&remote).await;
        engine.store().create_record(beer("2026-02-18")).await.unwrap();

        assert!(matches!(
            engine.push_records().await.unwrap(),
            RemoteOutcome::UpdateRequired(_)
        ));
        assert!(matches!(
            engine.pull_records(None).await.unwrap(),
            RemoteOutcome::UpdateRequired(_)
        ));

        assert_eq!(engine.store().count_unsynced().await.unwrap(), 1);
        assert_eq!(engine.store().list_records(true).await.unwrap().len(), 1);
        assert_eq!(engine.last_sync_at().await, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pull_inserts_unknown_records_as_synced() {
        let remote = MemoryRemote::default();
        remote.insert_record(remote_row("r1", "2026-02-18T12:00:00.000Z", 180.0));
        let engine = engine(&remote).await;

        let report = applied(engine.pull_records(None).await.unwrap());
        assert_eq!(report.merged, 1);

        let record = engine
            .store()
            .get_record(&"r1".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(record.synced);
        assert_eq!(record.drink_type, "sake");
        assert_eq!(record.amount_ml, 180.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn repeated_pull_is_idempotent() {
        let remote = MemoryRemote::default();
        remote.insert_record(remote_row("r1", "2026-02-18T12:00:00.000Z", 180.0));
        remote.insert_record(remote_row("r2", "2026-02-18T13:00:00.000Z", 90.0));
        let engine = engine(&remote).await;

        assert_eq!(applied(engine.pull_records(None).await.unwrap()).merged, 2);
        assert_eq!(applied(engine.pull_records(None).await.unwrap()).merged, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pull_applies_strict_last_writer_wins() {
        let remote = MemoryRemote::default();
        let engine = engine(&remote).await;
        let store = engine.store();

        let local = store.create_record(beer("2026-02-18")).await.unwrap();
        let id = local.id.as_str().to_string();
        let instant = parse_iso_timestamp(&local.updated_at).unwrap();
        let shifted = |ms: i64| to_iso_timestamp(instant + Duration::milliseconds(ms));

        // Equal timestamps keep the local copy.
        remote.insert_record(remote_row(&id, &local.updated_at, 999.0));
        assert_eq!(applied(engine.pull_records(None).await.unwrap()).merged, 0);
        assert_eq!(store.get_record(&local.id).await.unwrap().unwrap(), local);

        // Older remote copies are ignored.
        remote.insert_record(remote_row(&id, &shifted(-1), 999.0));
        assert_eq!(applied(engine.pull_records(None).await.unwrap()).merged, 0);
        assert_eq!(store.get_record(&local.id).await.unwrap().unwrap(), local);

        // Newer remote copies overwrite.
        remote.insert_record(remote_row(&id, &shifted(1), 999.0));
        assert_eq!(applied(engine.pull_records(None).await.unwrap()).merged, 1);
        let merged = store.get_record(&local.id).await.unwrap().unwrap();
        assert_eq!(merged.amount_ml, 999.0);
        assert_eq!(merged.updated_at, shifted(1));
        assert!(merged.synced);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pull_sends_since_verbatim() {
        let remote = MemoryRemote::default();
        let engine = engine(&remote).await;

        engine
            .pull_records(Some("2025-01-01T00:00:00.000Z"))
            .await
            .unwrap();

        assert_eq!(
            remote.requests()[0],
            json!({
                "apiVersion": 1,
                "type": "records",
                "action": "get",
                "since": "2025-01-01T00:00:00.000Z"
            })
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pull_normalizes_dates_and_skips_bad_rows() {
        let remote = MemoryRemote::default();
        let mut row = remote_row("r1", "2026-02-18T12:00:00.000Z", 180.0);
        row["date"] = json!("2026-02-17T00:00:00.000Z");
        remote.insert_record(row);
        let mut bad = remote_row("r2", "2026-02-18T12:00:00.000Z", 180.0);
        bad["date"] = json!("someday");
        remote.insert_record(bad);
        let engine = engine(&remote).await;

        let report = applied(engine.pull_records(None).await.unwrap());
        assert_eq!(report, PullReport { merged: 1, received: 2, skipped: 1 });

        let record = engine
            .store()
            .get_record(&"r1".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.date, "2026-02-17");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pull_skips_rows_without_amount() {
        let remote = MemoryRemote::default();
        let mut row = remote_row("r1", "2026-02-18T12:00:00.000Z", 180.0);
        row.as_object_mut().unwrap().remove("amountMl");
        remote.insert_record(row);
        let engine = engine(&remote).await;

        let report = applied(engine.pull_records(None).await.unwrap());
        assert_eq!(report, PullReport { merged: 0, received: 1, skipped: 1 });
        assert!(engine.store().list_records(true).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn epoch_updated_at_competes_as_an_instant() {
        let remote = MemoryRemote::default();
        let engine = engine(&remote).await;
        let local = engine.store().create_record(beer("2026-02-18")).await.unwrap();
        let newer = parse_iso_timestamp(&local.updated_at).unwrap() + Duration::minutes(5);

        let mut row = remote_row(local.id.as_str(), "", 999.0);
        row["updatedAt"] = json!(newer.timestamp_millis());
        remote.insert_record(row);

        let report = applied(engine.pull_records(None).await.unwrap());
        assert_eq!(report.merged, 1);

        let stored = engine.store().get_record(&local.id).await.unwrap().unwrap();
        assert_eq!(stored.amount_ml, 999.0);
        assert_eq!(stored.updated_at, to_iso_timestamp(newer));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn soft_delete_propagates_between_devices() {
        let remote = MemoryRemote::default();
        let phone = engine(&remote).await;
        let laptop = engine(&remote).await;

        let record = phone.store().create_record(beer("2026-02-18")).await.unwrap();
        applied(phone.push_records().await.unwrap());
        applied(laptop.pull_records(None).await.unwrap());
        let since = laptop.last_sync_at().await;

        let deleted = phone.store().delete_record(&record.id).await.unwrap();
        assert!(!deleted.synced);
        let unsynced = phone.store().list_unsynced().await.unwrap();
        assert_eq!(unsynced.len(), 1);
        assert!(unsynced[0].deleted);

        let pushed = applied(phone.push_records().await.unwrap());
        assert_eq!(pushed.sent, 1);
        assert_eq!(remote.record(record.id.as_str()).unwrap()["deleted"], json!(true));

        let pulled = applied(laptop.pull_records(since.as_deref()).await.unwrap());
        assert_eq!(pulled.merged, 1);
        let on_laptop = laptop.store().get_record(&record.id).await.unwrap().unwrap();
        assert!(on_laptop.deleted);
        assert!(on_laptop.synced);
        assert!(laptop.store().list_records(false).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn edit_during_push_stays_unsynced() {
        let remote = MemoryRemote::default();
        let engine = engine(&remote).await;
        let record = engine.store().create_record(beer("2026-02-18")).await.unwrap();

        // Simulates an edit landing between the remote save and the local mark.
        let stale = PushedVersion::from(&record);
        engine
            .store()
            .update_record(
                &record.id,
                RecordPatch {
                    amount_ml: Some(500.0),
                    ..RecordPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(engine.store().mark_synced(&[stale]).await.unwrap(), 0);
        assert_eq!(engine.store().count_unsynced().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn push_settings_sends_effective_values() {
        let remote = MemoryRemote::default();
        let engine = engine(&remote).await;

        applied(engine.push_settings().await.unwrap());

        let settings = remote.settings();
        let keys: Vec<&str> = settings.keys().map(String::as_str).collect();
        let mut expected = SYNCED_SETTING_KEYS.to_vec();
        expected.sort_unstable();
        assert_eq!(keys, expected);
        assert_eq!(settings[KEY_DEFAULT_TYPE_ID], json!(DEFAULT_TYPE_ID));
        assert_eq!(
            settings[KEY_COLOR_THRESHOLDS],
            serde_json::to_value(AllThresholds::default()).unwrap()
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pull_settings_replaces_only_changed_keys() {
        let remote = MemoryRemote::default();
        let thresholds = AllThresholds {
            daily: ColorThresholds {
                low: 10.0,
                high: 30.0,
            },
            ..AllThresholds::default()
        };
        remote.insert_setting(KEY_COLOR_THRESHOLDS, serde_json::to_value(thresholds).unwrap());
        remote.insert_setting(KEY_DEFAULT_TYPE_ID, json!("wine"));
        remote.insert_setting(KEY_VOLUME_PRESETS, json!(null));
        remote.insert_setting(KEY_DRINK_TYPES, json!("not a list"));
        let engine = engine(&remote).await;

        let report = applied(engine.pull_settings().await.unwrap());
        assert_eq!(report.updated, 2);

        let settings = engine.store().load_settings().await.unwrap();
        assert_eq!(settings.thresholds, thresholds);
        assert_eq!(settings.default_type_id, "wine");
        assert_eq!(settings.volume_presets, SettingsSnapshot::default().volume_presets);

        assert_eq!(applied(engine.pull_settings().await.unwrap()).updated, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn settings_round_trip_is_not_a_change() {
        let remote = MemoryRemote::default();
        let engine = engine(&remote).await;
        engine
            .store()
            .save_settings(&SettingsSnapshot::default())
            .await
            .unwrap();
        let stored = engine.store().get_setting_raw(KEY_COLOR_THRESHOLDS).await.unwrap();

        applied(engine.push_settings().await.unwrap());
        let report = applied(engine.pull_settings().await.unwrap());

        assert_eq!(report.updated, 0);
        assert_eq!(
            engine.store().get_setting_raw(KEY_COLOR_THRESHOLDS).await.unwrap(),
            stored
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn remote_defaults_match_unsaved_local_defaults() {
        let remote = MemoryRemote::default();
        let payload = settings_payload(&SettingsSnapshot::default()).unwrap();
        for (key, value) in payload {
            remote.insert_setting(&key, value);
        }
        // Sheets hand back whole numbers without a fraction.
        remote.insert_setting(
            KEY_COLOR_THRESHOLDS,
            json!({
                "monthly": {"high": 1200, "low": 600},
                "weekly": {"high": 280, "low": 140},
                "daily": {"high": 40, "low": 20}
            }),
        );
        let engine = engine(&remote).await;

        assert_eq!(applied(engine.pull_settings().await.unwrap()).updated, 0);
    }

    #[test]
    fn same_json_ignores_key_order_and_number_form() {
        assert!(same_json(
            &json!({"low": 20.0, "high": 40.0}),
            &json!({"high": 40, "low": 20})
        ));
        assert!(!same_json(&json!({"low": 20.0}), &json!({"low": 21.0})));
        assert!(!same_json(&json!([1, 2]), &json!([2, 1])));
        assert!(!same_json(&json!({"low": 20}), &json!({"low": 20, "high": 40})));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn settings_sync_does_not_touch_last_sync() {
        let remote = MemoryRemote::default();
        let engine = engine(&remote).await;

        applied(engine.push_settings().await.unwrap());
        applied(engine.pull_settings().await.unwrap());
        assert_eq!(engine.last_sync_at().await, None);
    }
}
