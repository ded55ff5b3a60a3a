use std::path::Path;

use nomi_core::models::{RecordPatch, SettingsSnapshot};
use nomi_core::util::normalize_text_option;

use crate::cli::RecordArgs;
use crate::commands::common::{
    normalize_record_identifier, open_database, resolve_record, sync_after_change,
};
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    fields: RecordArgs,
    db_path: &Path,
    no_sync: bool,
) -> Result<(), CliError> {
    let normalized_id = normalize_record_identifier(id)?;
    let db = open_database(db_path).await?;
    let settings = db.load_settings().await?;
    let patch = build_patch(fields, &settings)?;
    let record = resolve_record(&normalized_id, &db).await?;

    let updated = db.update_record(&record.id, patch).await?;
    println!("{}", updated.id);
    sync_after_change(&db, no_sync).await;
    Ok(())
}

pub fn build_patch(fields: RecordArgs, settings: &SettingsSnapshot) -> Result<RecordPatch, CliError> {
    let drink_type = normalize_text_option(fields.drink_type);
    if let Some(type_id) = &drink_type {
        if settings.drink_type(type_id).is_none() {
            return Err(CliError::UnknownDrinkType(type_id.clone()));
        }
    }

    let patch = RecordPatch {
        date: normalize_text_option(fields.date),
        // An explicit empty name clears it.
        name: fields.name,
        drink_type,
        percentage: fields.percentage,
        amount_ml: fields.amount,
    };
    if patch.is_empty() {
        return Err(CliError::EmptyEdit);
    }
    Ok(patch)
}
