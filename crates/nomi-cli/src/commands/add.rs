use std::path::Path;

use chrono::NaiveDate;
use nomi_core::models::{NewRecord, SettingsSnapshot};
use nomi_core::util::normalize_text_option;

use crate::cli::RecordArgs;
use crate::commands::common::{format_date, open_database, sync_after_change, today};
use crate::error::CliError;

pub async fn run_add(args: RecordArgs, db_path: &Path, no_sync: bool) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let settings = db.load_settings().await?;
    let input = build_new_record(args, &settings, today())?;
    let record = db.create_record(input).await?;

    println!("{}", record.id);
    sync_after_change(&db, no_sync).await;
    Ok(())
}

/// Fill omitted fields from the drink type: its strength, its default
/// amount, and its name.
pub fn build_new_record(
    args: RecordArgs,
    settings: &SettingsSnapshot,
    today: NaiveDate,
) -> Result<NewRecord, CliError> {
    let type_id = normalize_text_option(args.drink_type)
        .unwrap_or_else(|| settings.default_type_id.clone());
    let drink_type = settings
        .drink_type(&type_id)
        .ok_or_else(|| CliError::UnknownDrinkType(type_id.clone()))?;

    let amount_ml = args
        .amount
        .or(drink_type.default_amount)
        .ok_or_else(|| CliError::MissingAmount(type_id.clone()))?;

    Ok(NewRecord {
        date: normalize_text_option(args.date).unwrap_or_else(|| format_date(today)),
        name: normalize_text_option(args.name).unwrap_or_else(|| drink_type.name.clone()),
        drink_type: type_id,
        percentage: args.percentage.unwrap_or(drink_type.percent),
        amount_ml,
    })
}
