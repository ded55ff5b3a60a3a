use std::path::Path;

use chrono::{Duration, NaiveDate};
use nomi_core::models::{
    validate_date, AllThresholds, ColorThresholds, DrinkType, SettingsSnapshot, DATE_FORMAT,
};
use nomi_core::stats::{
    calories, canned_beer_equivalent, daily_totals, standard_units, total_pure_alcohol,
    IntakeLevel,
};
use nomi_core::DrinkingRecord;
use serde::Serialize;

use crate::commands::common::{format_date, open_database, round_tenth, today};
use crate::error::CliError;

const DEFAULT_RANGE_DAYS: i64 = 7;

#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub from: String,
    pub to: String,
    pub drinks: usize,
    pub pure_alcohol_g: f64,
    pub canned_beer: f64,
    pub standard_units: f64,
    pub calories: f64,
    pub level: IntakeLevel,
    pub days: Vec<DayStats>,
}

#[derive(Debug, Serialize)]
pub struct DayStats {
    pub date: String,
    pub drinks: usize,
    pub amount_ml: f64,
    pub pure_alcohol_g: f64,
    pub level: IntakeLevel,
}

pub async fn run_stats(
    from: Option<&str>,
    to: Option<&str>,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let (from, to) = resolve_range(from, to, today())?;
    let db = open_database(db_path).await?;
    let settings = db.load_settings().await?;
    let records = db
        .list_records_between(&format_date(from), &format_date(to))
        .await?;
    let report = build_stats(&records, &settings, from, to);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_stats_lines(&report) {
            println!("{line}");
        }
    }
    Ok(())
}

/// Inclusive range; `to` defaults to today and `from` to a week ending at `to`.
pub fn resolve_range(
    from: Option<&str>,
    to: Option<&str>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), CliError> {
    let to = to.map_or(Ok(today), parse_date)?;
    let from = from.map_or(Ok(to - Duration::days(DEFAULT_RANGE_DAYS - 1)), parse_date)?;
    if from > to {
        return Err(CliError::InvalidRange(format!(
            "{} is after {}",
            format_date(from),
            format_date(to)
        )));
    }
    Ok((from, to))
}

fn parse_date(value: &str) -> Result<NaiveDate, CliError> {
    validate_date(value)?;
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| CliError::InvalidRange(format!("unreadable date '{value}'")))
}

pub fn build_stats(
    records: &[DrinkingRecord],
    settings: &SettingsSnapshot,
    from: NaiveDate,
    to: NaiveDate,
) -> StatsReport {
    let live = records
        .iter()
        .filter(|record| !record.deleted)
        .collect::<Vec<_>>();
    let grams = total_pure_alcohol(records);
    let kcal = live
        .iter()
        .map(|record| {
            let coefficient = settings
                .drink_type(&record.drink_type)
                .map_or(1.0, DrinkType::calorie_coefficient);
            calories(record.pure_alcohol_grams(), coefficient)
        })
        .sum::<f64>();
    let span_days = (to - from).num_days() + 1;
    let period = period_thresholds(&settings.thresholds, span_days);

    StatsReport {
        from: format_date(from),
        to: format_date(to),
        drinks: live.len(),
        pure_alcohol_g: round_tenth(grams),
        canned_beer: round_tenth(canned_beer_equivalent(grams)),
        standard_units: round_tenth(standard_units(grams)),
        calories: kcal.round(),
        level: period.level(grams),
        days: daily_totals(records)
            .into_iter()
            .map(|day| DayStats {
                level: settings.thresholds.daily.level(day.pure_alcohol_g),
                date: day.date,
                drinks: day.drinks,
                amount_ml: day.amount_ml,
                pure_alcohol_g: round_tenth(day.pure_alcohol_g),
            })
            .collect(),
    }
}

/// Thresholds of the shortest period covering the range.
pub const fn period_thresholds(thresholds: &AllThresholds, span_days: i64) -> ColorThresholds {
    if span_days <= 1 {
        thresholds.daily
    } else if span_days <= 7 {
        thresholds.weekly
    } else {
        thresholds.monthly
    }
}

pub fn format_stats_lines(report: &StatsReport) -> Vec<String> {
    let mut lines = vec![
        format!("{} .. {}", report.from, report.to),
        format!(
            "{} drinks, {:.1}g alcohol ({}), {:.1} cans of beer, {:.1} units, {:.0} kcal",
            report.drinks,
            report.pure_alcohol_g,
            level_label(report.level),
            report.canned_beer,
            report.standard_units,
            report.calories,
        ),
    ];
    lines.extend(report.days.iter().map(|day| {
        format!(
            "  {}  {} drinks  {:.1}g  {}",
            day.date,
            day.drinks,
            day.pure_alcohol_g,
            level_label(day.level)
        )
    }));
    lines
}

const fn level_label(level: IntakeLevel) -> &'static str {
    match level {
        IntakeLevel::Low => "low",
        IntakeLevel::Moderate => "moderate",
        IntakeLevel::High => "high",
    }
}
