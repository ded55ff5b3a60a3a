//! Derived intake statistics.
//!
//! Pure arithmetic over records; deleted records never count.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{ColorThresholds, DrinkingRecord};

/// Density of ethanol in g/ml.
const ETHANOL_DENSITY: f64 = 0.8;
/// Grams of alcohol in a 350 ml can of 5% beer.
const CANNED_BEER_GRAMS: f64 = 14.0;
/// Grams of alcohol in one standard drink unit.
const STANDARD_UNIT_GRAMS: f64 = 20.0;
/// Kilocalories per gram of alcohol.
const KCAL_PER_GRAM: f64 = 7.1;

/// Grams of pure alcohol: `ml × pct/100 × 0.8`.
pub fn pure_alcohol_grams(amount_ml: f64, percentage: f64) -> f64 {
    amount_ml * (percentage / 100.0) * ETHANOL_DENSITY
}

/// How many 350 ml cans of 5% beer the alcohol amounts to.
pub fn canned_beer_equivalent(pure_alcohol_g: f64) -> f64 {
    pure_alcohol_g / CANNED_BEER_GRAMS
}

/// Standard drink units.
pub fn standard_units(pure_alcohol_g: f64) -> f64 {
    pure_alcohol_g / STANDARD_UNIT_GRAMS
}

/// Estimated calories, scaled by a drink type's coefficient.
pub fn calories(pure_alcohol_g: f64, coefficient: f64) -> f64 {
    pure_alcohol_g * KCAL_PER_GRAM * coefficient
}

/// Intake band relative to a period's thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntakeLevel {
    Low,
    Moderate,
    High,
}

impl ColorThresholds {
    /// Classify a grams total: `<= low` is low, `<= high` moderate, else high.
    pub fn level(&self, grams: f64) -> IntakeLevel {
        if grams <= self.low {
            IntakeLevel::Low
        } else if grams <= self.high {
            IntakeLevel::Moderate
        } else {
            IntakeLevel::High
        }
    }
}

/// Totals for one logical day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: String,
    pub drinks: usize,
    pub amount_ml: f64,
    pub pure_alcohol_g: f64,
}

/// Per-day totals, ordered by date.
pub fn daily_totals(records: &[DrinkingRecord]) -> Vec<DailyTotal> {
    let mut by_date: BTreeMap<&str, DailyTotal> = BTreeMap::new();

    for record in records.iter().filter(|record| !record.deleted) {
        let total = by_date
            .entry(record.date.as_str())
            .or_insert_with(|| DailyTotal {
                date: record.date.clone(),
                drinks: 0,
                amount_ml: 0.0,
                pure_alcohol_g: 0.0,
            });
        total.drinks += 1;
        total.amount_ml += record.amount_ml;
        total.pure_alcohol_g += record.pure_alcohol_grams();
    }

    by_date.into_values().collect()
}

/// Grams of alcohol across all non-deleted records.
pub fn total_pure_alcohol(records: &[DrinkingRecord]) -> f64 {
    records
        .iter()
        .filter(|record| !record.deleted)
        .map(DrinkingRecord::pure_alcohol_grams)
        .sum()
}
