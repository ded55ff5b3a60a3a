//! Drinking record model

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::util::{next_updated_at, now_iso};

/// Calendar format used for the logical `date` field.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Hour before which a drink still counts toward the previous day.
pub const DEFAULT_DAY_START_HOUR: u32 = 3;

/// A unique record identifier.
///
/// New ids are UUID v7 (time-sortable), but ids created by other replicas are
/// kept verbatim, so any non-empty string is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create a new unique record ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("record id must not be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// One logged drink event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrinkingRecord {
    pub id: RecordId,
    /// Logical day (`YYYY-MM-DD`) the drink counts toward
    pub date: String,
    pub name: String,
    #[serde(rename = "type")]
    pub drink_type: String,
    /// Alcohol by volume, 0 to 100
    pub percentage: f64,
    pub amount_ml: f64,
    pub created_at: String,
    pub updated_at: String,
    /// Soft delete flag, replicated like any other edit
    #[serde(default)]
    pub deleted: bool,
    /// Whether the remote is known to hold this exact version
    #[serde(default)]
    pub synced: bool,
}

/// Input for creating a record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub date: String,
    pub name: String,
    pub drink_type: String,
    pub percentage: f64,
    pub amount_ml: f64,
}

/// Field edits applied to an existing record. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub date: Option<String>,
    pub name: Option<String>,
    pub drink_type: Option<String>,
    pub percentage: Option<f64>,
    pub amount_ml: Option<f64>,
}

impl RecordPatch {
    /// True when the patch would not change anything.
    pub const fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.name.is_none()
            && self.drink_type.is_none()
            && self.percentage.is_none()
            && self.amount_ml.is_none()
    }
}

impl DrinkingRecord {
    /// Build a fresh, unsynced record from user input.
    pub fn new(input: NewRecord) -> Result<Self> {
        validate_date(&input.date)?;
        validate_measurements(input.percentage, input.amount_ml)?;

        let now = now_iso();
        Ok(Self {
            id: RecordId::new(),
            date: input.date,
            name: input.name.trim().to_string(),
            drink_type: input.drink_type,
            percentage: input.percentage,
            amount_ml: input.amount_ml,
            created_at: now.clone(),
            updated_at: now,
            deleted: false,
            synced: false,
        })
    }

    /// Apply a local edit: bumps `updated_at` and clears `synced`.
    pub fn apply_patch(&mut self, patch: RecordPatch) -> Result<()> {
        if let Some(date) = patch.date {
            validate_date(&date)?;
            self.date = date;
        }
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(drink_type) = patch.drink_type {
            self.drink_type = drink_type;
        }
        let percentage = patch.percentage.unwrap_or(self.percentage);
        let amount_ml = patch.amount_ml.unwrap_or(self.amount_ml);
        validate_measurements(percentage, amount_ml)?;
        self.percentage = percentage;
        self.amount_ml = amount_ml;

        self.touch();
        Ok(())
    }

    /// Mark the record deleted. Deletion is an edit, not a removal.
    pub fn soft_delete(&mut self) {
        self.deleted = true;
        self.touch();
    }

    /// Grams of pure alcohol in this drink.
    #[must_use]
    pub fn pure_alcohol_grams(&self) -> f64 {
        crate::stats::pure_alcohol_grams(self.amount_ml, self.percentage)
    }

    fn touch(&mut self) {
        self.updated_at = next_updated_at(&self.updated_at);
        self.synced = false;
    }
}

/// Check that a logical date is a real `YYYY-MM-DD` calendar day.
pub fn validate_date(date: &str) -> Result<()> {
    NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map(|_| ())
        .map_err(|_| Error::InvalidInput(format!("date must be YYYY-MM-DD, got '{date}'")))
}

/// Check strength and volume ranges.
pub fn validate_measurements(percentage: f64, amount_ml: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&percentage) {
        return Err(Error::InvalidInput(format!(
            "percentage must be between 0 and 100, got {percentage}"
        )));
    }
    if !(amount_ml.is_finite() && amount_ml > 0.0) {
        return Err(Error::InvalidInput(format!(
            "amount must be greater than 0 ml, got {amount_ml}"
        )));
    }
    Ok(())
}

/// The logical day a drink at `now` counts toward.
///
/// Before `day_start_hour` (e.g. 02:30 with a 03:00 cut-off) the drink still
/// belongs to the previous evening.
#[must_use]
pub fn logical_date(now: NaiveDateTime, day_start_hour: u32) -> NaiveDate {
    if now.hour() < day_start_hour {
        (now - Duration::days(1)).date()
    } else {
        now.date()
    }
}
