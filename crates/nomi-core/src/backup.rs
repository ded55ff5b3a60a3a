//! Backup export/import and local data reset.
//!
//! A backup is one pretty-printed JSON document:
//! `{version, exportedAt, records, settings: {presets, thresholds, gasUrl?}}`.
//! Import is a trusted overwrite by id; it bypasses last-writer-wins.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{normalize_endpoint, SyncConfig};
use crate::models::{
    validate_date, validate_measurements, AllThresholds, DrinkingRecord, VolumePreset,
    KEY_COLOR_THRESHOLDS, KEY_ENDPOINT_URL, KEY_VOLUME_PRESETS,
};
use crate::services::DatabaseService;
use crate::util::now_iso;
use crate::{Error, Result};

/// Backup document format version.
pub const BACKUP_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub version: u32,
    pub exported_at: String,
    pub records: Vec<DrinkingRecord>,
    #[serde(default)]
    pub settings: BackupSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presets: Option<Vec<VolumePreset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<AllThresholds>,
    /// Only read on import; exports never carry the endpoint.
    #[serde(default, skip_serializing)]
    pub gas_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub records: usize,
    pub settings: usize,
    pub endpoint_set: bool,
}

/// Snapshot every record (soft-deleted included) and the presets and
/// thresholds.
pub async fn export_backup(db: &DatabaseService) -> Result<BackupDocument> {
    let records = db.list_records(true).await?;
    let settings = db.load_settings().await?;

    Ok(BackupDocument {
        version: BACKUP_VERSION,
        exported_at: now_iso(),
        records,
        settings: BackupSettings {
            presets: Some(settings.volume_presets),
            thresholds: Some(settings.thresholds),
            gas_url: None,
        },
    })
}

/// Render a backup as pretty-printed JSON.
pub fn render_backup(document: &BackupDocument) -> Result<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// `nomi-log-backup-YYYY-MM-DD.json`
pub fn suggested_backup_file_name(date: NaiveDate) -> String {
    format!("nomi-log-backup-{}.json", date.format("%Y-%m-%d"))
}

/// Parse and validate a backup. Nothing is written, so a rejected document
/// leaves the store untouched.
pub fn parse_backup(payload: &str) -> Result<BackupDocument> {
    let raw: Value = serde_json::from_str(payload)
        .map_err(|error| Error::InvalidBackup(format!("not valid JSON: {error}")))?;
    if !raw.get("records").is_some_and(Value::is_array) {
        return Err(Error::InvalidBackup("records must be an array".to_string()));
    }

    let mut document: BackupDocument = serde_json::from_value(raw)
        .map_err(|error| Error::InvalidBackup(error.to_string()))?;
    if document.version != BACKUP_VERSION {
        return Err(Error::InvalidBackup(format!(
            "unsupported version {} (expected {BACKUP_VERSION})",
            document.version
        )));
    }

    for (index, record) in document.records.iter().enumerate() {
        validate_record(record)
            .map_err(|error| Error::InvalidBackup(format!("record {}: {error}", index + 1)))?;
    }

    if let Some(gas_url) = document.settings.gas_url.take() {
        let endpoint = normalize_endpoint(&gas_url)
            .map_err(|error| Error::InvalidBackup(format!("gasUrl: {error}")))?;
        document.settings.gas_url = Some(endpoint);
    }

    Ok(document)
}

fn validate_record(record: &DrinkingRecord) -> Result<()> {
    if record.id.as_str().trim().is_empty() {
        return Err(Error::InvalidInput("id must not be empty".to_string()));
    }
    validate_date(&record.date)?;
    validate_measurements(record.percentage, record.amount_ml)
}

/// Overwrite records by id and replace the settings the backup carries.
pub async fn import_backup(db: &DatabaseService, document: &BackupDocument) -> Result<ImportReport> {
    let records = db.upsert_records(&document.records).await?;

    let mut entries = Vec::new();
    if let Some(presets) = &document.settings.presets {
        entries.push((KEY_VOLUME_PRESETS.to_string(), serde_json::to_string(presets)?));
    }
    if let Some(thresholds) = &document.settings.thresholds {
        entries.push((
            KEY_COLOR_THRESHOLDS.to_string(),
            serde_json::to_string(thresholds)?,
        ));
    }
    if let Some(endpoint) = &document.settings.gas_url {
        entries.push((KEY_ENDPOINT_URL.to_string(), serde_json::to_string(endpoint)?));
    }
    db.replace_settings(&entries).await?;

    tracing::info!("Imported {records} records from backup");
    Ok(ImportReport {
        records,
        settings: entries.len(),
        endpoint_set: document.settings.gas_url.is_some(),
    })
}

/// Delete every record and restore default presets and thresholds.
///
/// Refused while an endpoint is configured; the next sync would otherwise
/// have nothing to reconcile against.
pub async fn reset_local_data(db: &DatabaseService) -> Result<u64> {
    if SyncConfig::load(db).await?.is_configured() {
        return Err(Error::InvalidInput(
            "disconnect the sync endpoint before resetting local data".to_string(),
        ));
    }

    let removed = db.clear_records().await?;
    db.remove_setting(KEY_VOLUME_PRESETS).await?;
    db.remove_setting(KEY_COLOR_THRESHOLDS).await?;
    tracing::info!("Reset local data ({removed} records removed)");
    Ok(removed)
}
