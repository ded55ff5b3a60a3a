//! Wire format of the remote endpoint.
//!
//! Every call is a `POST` with a JSON body
//! `{apiVersion, type, action, records?, since?, settings?}` and every reply
//! is `{ok, version, data?, error?}`.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{validate_measurements, DrinkingRecord, RecordId, DATE_FORMAT};
use crate::util::{parse_iso_timestamp, to_iso_timestamp};

/// Request envelope version sent with every call.
pub const API_VERSION: u32 = 1;

/// Oldest remote script release this client understands.
///
/// Versions are date-coded (`2026-02-18`, `2026-02-18-final`) and compared
/// as plain strings.
pub const REQUIRED_REMOTE_VERSION: &str = "2026-02-18";

/// True if a remote reporting `remote` may be trusted.
pub fn version_supported(remote: &str, required: &str) -> bool {
    remote >= required
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Records,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Save,
    Get,
}

/// Outgoing request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest<'a> {
    pub api_version: u32,
    #[serde(rename = "type")]
    pub kind: PayloadKind,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<PushRecord<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<&'a Map<String, Value>>,
}

impl<'a> SyncRequest<'a> {
    const fn new(kind: PayloadKind, action: Action) -> Self {
        Self {
            api_version: API_VERSION,
            kind,
            action,
            records: None,
            since: None,
            settings: None,
        }
    }

    pub fn save_records(records: &'a [DrinkingRecord]) -> Self {
        Self {
            records: Some(records.iter().map(PushRecord::from).collect()),
            ..Self::new(PayloadKind::Records, Action::Save)
        }
    }

    pub fn get_records(since: Option<&'a str>) -> Self {
        Self {
            since,
            ..Self::new(PayloadKind::Records, Action::Get)
        }
    }

    pub fn save_settings(settings: &'a Map<String, Value>) -> Self {
        Self {
            settings: Some(settings),
            ..Self::new(PayloadKind::Settings, Action::Save)
        }
    }

    pub const fn get_settings() -> Self {
        Self::new(PayloadKind::Settings, Action::Get)
    }
}

/// A record as pushed; the local `synced` flag never leaves the device.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRecord<'a> {
    pub id: &'a str,
    pub date: &'a str,
    pub name: &'a str,
    #[serde(rename = "type")]
    pub drink_type: &'a str,
    pub percentage: f64,
    pub amount_ml: f64,
    pub created_at: &'a str,
    pub updated_at: &'a str,
    pub deleted: bool,
}

impl<'a> From<&'a DrinkingRecord> for PushRecord<'a> {
    fn from(record: &'a DrinkingRecord) -> Self {
        Self {
            id: record.id.as_str(),
            date: &record.date,
            name: &record.name,
            drink_type: &record.drink_type,
            percentage: record.percentage,
            amount_ml: record.amount_ml,
            created_at: &record.created_at,
            updated_at: &record.updated_at,
            deleted: record.deleted,
        }
    }
}

/// Incoming response envelope.
#[derive(Debug, Deserialize)]
pub struct SyncResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub data: Option<ResponseData>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Payload of a successful response. Which fields are present depends on
/// the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    #[serde(default)]
    pub updated: Option<u64>,
    #[serde(default)]
    pub merged: Option<u64>,
    /// Rows are kept raw and decoded one by one, so a single bad row does
    /// not discard the batch.
    #[serde(default)]
    pub records: Option<Vec<Value>>,
    #[serde(default)]
    pub settings: Option<Map<String, Value>>,
    /// Ids the remote actually stored, when the script reports them.
    #[serde(default)]
    pub saved_ids: Option<Vec<String>>,
}

/// A record row as the remote returns it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    id: Value,
    date: Value,
    #[serde(default)]
    name: Option<Value>,
    #[serde(rename = "type", default)]
    drink_type: Option<Value>,
    #[serde(default)]
    percentage: Option<Value>,
    #[serde(default)]
    amount_ml: Option<Value>,
    #[serde(default)]
    created_at: Option<Value>,
    updated_at: Value,
    #[serde(default)]
    deleted: Option<Value>,
}

/// Decode one remote row into a local record marked `synced`.
///
/// Spreadsheet cells come back loosely typed, so numbers may arrive as
/// strings and booleans as `"TRUE"`. Rows without an id, a usable date, or
/// an `updatedAt` are rejected with a reason.
pub fn decode_remote_record(
    value: Value,
    date_offset: FixedOffset,
) -> Result<DrinkingRecord, String> {
    let raw: RawRecord =
        serde_json::from_value(value).map_err(|error| format!("malformed row: {error}"))?;

    let id = text(&raw.id)
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| "row has no id".to_string())?;
    let date = normalize_date(&raw.date, date_offset)
        .ok_or_else(|| format!("row {id} has an unreadable date: {}", raw.date))?;
    let updated_at = timestamp(&raw.updated_at)
        .ok_or_else(|| format!("row {id} has no updatedAt"))?;
    let created_at = raw
        .created_at
        .as_ref()
        .and_then(timestamp)
        .unwrap_or_else(|| updated_at.clone());

    let percentage = raw.percentage.as_ref().and_then(number).unwrap_or(0.0);
    let amount_ml = raw.amount_ml.as_ref().and_then(number).unwrap_or(0.0);
    validate_measurements(percentage, amount_ml).map_err(|error| format!("row {id}: {error}"))?;

    Ok(DrinkingRecord {
        id: RecordId::from(id),
        date,
        name: raw.name.as_ref().and_then(text).unwrap_or_default(),
        drink_type: raw.drink_type.as_ref().and_then(text).unwrap_or_default(),
        percentage,
        amount_ml,
        created_at,
        updated_at,
        deleted: raw.deleted.as_ref().is_some_and(flag),
        synced: true,
    })
}

/// Normalize a remote date cell to `YYYY-MM-DD`.
///
/// Plain dates pass through verbatim. Timestamps (ISO strings or epoch
/// milliseconds) are converted to the calendar date at `offset`, since the
/// sheet stores a date cell as midnight in the script's time zone.
pub fn normalize_date(value: &Value, offset: FixedOffset) -> Option<String> {
    match value {
        Value::String(raw) => {
            let raw = raw.trim();
            if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
                return Some(date.format(DATE_FORMAT).to_string());
            }
            parse_iso_timestamp(raw).map(|instant| date_at(instant, offset))
        }
        Value::Number(number) => number
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|instant| date_at(instant, offset)),
        _ => None,
    }
}

fn date_at(instant: DateTime<Utc>, offset: FixedOffset) -> String {
    instant
        .with_timezone(&offset)
        .date_naive()
        .format(DATE_FORMAT)
        .to_string()
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// ISO strings are kept verbatim; epoch milliseconds become ISO so they
/// compare as instants.
fn timestamp(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => epoch_millis(number.as_i64()?),
        Value::String(text) => {
            let trimmed = text.trim();
            if !trimmed.is_empty() && trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
                return epoch_millis(trimmed.parse().ok()?);
            }
            Some(text.clone()).filter(|_| !trimmed.is_empty())
        }
        _ => None,
    }
}

fn epoch_millis(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis).map(to_iso_timestamp)
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => text.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}
