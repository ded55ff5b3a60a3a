use std::env;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use nomi_core::models::{logical_date, SettingsSnapshot, DATE_FORMAT, DEFAULT_DAY_START_HOUR};
use nomi_core::sync::{HttpTransport, StatusEvent, SyncEngine, SyncOrchestrator};
use nomi_core::{DatabaseService, DrinkingRecord, RecordId, SyncConfig};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::CliError;

pub const ENV_DB_PATH: &str = "NOMI_DB_PATH";
pub const ENV_ENDPOINT_URL: &str = "NOMI_ENDPOINT_URL";

const SHORT_ID_LEN: usize = 13;

#[derive(Debug, Serialize)]
pub struct RecordListItem {
    pub id: String,
    pub date: String,
    pub name: String,
    pub drink_type: String,
    pub amount_ml: f64,
    pub percentage: f64,
    pub pure_alcohol_g: f64,
    pub created_at: String,
    pub updated_at: String,
    pub deleted: bool,
    pub synced: bool,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path {
        return Ok(path);
    }
    if let Some(path) = env::var_os(ENV_DB_PATH).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    default_db_path()
}

fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("nomi-log").join("nomi.db"))
        .ok_or(CliError::NoDataDir)
}

pub async fn open_database(db_path: &Path) -> Result<DatabaseService, CliError> {
    Ok(DatabaseService::open_path(db_path).await?)
}

/// Persisted sync config with the `NOMI_ENDPOINT_URL` override applied.
pub async fn load_sync_config(db: &DatabaseService) -> Result<SyncConfig, CliError> {
    let endpoint_override = env::var(ENV_ENDPOINT_URL).ok();
    Ok(SyncConfig::load(db)
        .await?
        .with_endpoint(endpoint_override.as_deref())?)
}

pub async fn build_orchestrator(
    db: &DatabaseService,
) -> Result<SyncOrchestrator<HttpTransport>, CliError> {
    let config = load_sync_config(db).await?;
    if !config.is_configured() {
        return Err(CliError::SyncNotConfigured);
    }

    let transport = HttpTransport::from_config(&config)?;
    let engine = SyncEngine::new(transport, db.clone(), config);
    Ok(SyncOrchestrator::new(engine))
}

/// Run a background sync after a local change. Never fails the command.
pub async fn sync_after_change(db: &DatabaseService, no_sync: bool) {
    if no_sync {
        return;
    }

    let orchestrator = match build_orchestrator(db).await {
        Ok(orchestrator) => orchestrator,
        Err(CliError::SyncNotConfigured) => return,
        Err(error) => {
            tracing::warn!("Sync setup failed: {error}");
            return;
        }
    };

    let mut events = orchestrator.subscribe();
    if let Err(error) = orchestrator.try_sync().await {
        tracing::warn!("Background sync task failed: {error}");
    }
    for event in drain_status_events(&mut events) {
        tracing::debug!("{}", format_status_event(&event));
    }
}

pub fn drain_status_events(events: &mut broadcast::Receiver<StatusEvent>) -> Vec<StatusEvent> {
    let mut drained = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => drained.push(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::debug!("Missed {skipped} status events");
            }
            Err(_) => break,
        }
    }
    drained
}

pub fn format_status_event(event: &StatusEvent) -> String {
    match &event.message {
        Some(message) => format!("[{}] {message}", event.status),
        None => format!("[{}]", event.status),
    }
}

/// Logical day for a drink logged right now.
pub fn today() -> NaiveDate {
    logical_date(Local::now().naive_local(), DEFAULT_DAY_START_HOUR)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn normalize_record_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyRecordId);
    }
    Ok(trimmed.to_string())
}

/// Find a record by exact id or unique id prefix, deleted ones included.
pub async fn resolve_record(
    record_query: &str,
    db: &DatabaseService,
) -> Result<DrinkingRecord, CliError> {
    let exact_id = RecordId::from(record_query.to_string());
    if let Some(record) = db.get_record(&exact_id).await? {
        return Ok(record);
    }

    let mut matching = db
        .list_records(true)
        .await?
        .into_iter()
        .filter(|record| record.id.as_str().starts_with(record_query))
        .collect::<Vec<_>>();

    match matching.len() {
        0 => Err(CliError::RecordNotFound(record_query.to_string())),
        1 => Ok(matching.remove(0)),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|record| short_id(&record.id))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousRecordId(format!(
                "ID prefix '{record_query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn short_id(id: &RecordId) -> String {
    id.as_str().chars().take(SHORT_ID_LEN).collect()
}

pub fn record_to_list_item(record: &DrinkingRecord) -> RecordListItem {
    RecordListItem {
        id: record.id.to_string(),
        date: record.date.clone(),
        name: record.name.clone(),
        drink_type: record.drink_type.clone(),
        amount_ml: record.amount_ml,
        percentage: record.percentage,
        pure_alcohol_g: round_tenth(record.pure_alcohol_grams()),
        created_at: record.created_at.clone(),
        updated_at: record.updated_at.clone(),
        deleted: record.deleted,
        synced: record.synced,
    }
}

/// One line per record: `<short id>  <date>  <emoji> <name>  <ml>  <pct>  <g>`.
/// Unsynced records are flagged with `*`.
pub fn format_record_lines(records: &[DrinkingRecord], settings: &SettingsSnapshot) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            let emoji = settings
                .drink_type(&record.drink_type)
                .map_or("·", |drink_type| drink_type.emoji.as_str());
            let mut line = format!(
                "{}  {}  {emoji} {}  {}ml  {}%  {:.1}g",
                short_id(&record.id),
                record.date,
                display_name(record, settings),
                format_number(record.amount_ml),
                format_number(record.percentage),
                record.pure_alcohol_grams(),
            );
            if !record.synced {
                line.push_str(" *");
            }
            if record.deleted {
                line.push_str(" (deleted)");
            }
            line
        })
        .collect()
}

fn display_name<'a>(record: &'a DrinkingRecord, settings: &'a SettingsSnapshot) -> &'a str {
    if !record.name.is_empty() {
        return &record.name;
    }
    settings
        .drink_type(&record.drink_type)
        .map_or(record.drink_type.as_str(), |drink_type| drink_type.name.as_str())
}

/// Render without a trailing `.0` for whole numbers.
pub fn format_number(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
