use std::path::Path;

use nomi_core::backup::{import_backup, parse_backup, ImportReport};

use crate::commands::common::open_database;
use crate::error::CliError;

pub async fn run_import(backup_path: &Path, db_path: &Path) -> Result<(), CliError> {
    let payload = std::fs::read_to_string(backup_path)?;
    // Validate everything before touching the store.
    let document = parse_backup(&payload)?;
    let db = open_database(db_path).await?;
    let report = import_backup(&db, &document).await?;

    println!("{}", format_import_report(&report));
    Ok(())
}

pub fn format_import_report(report: &ImportReport) -> String {
    let mut line = format!(
        "Imported {} records and {} settings",
        report.records, report.settings
    );
    if report.endpoint_set {
        line.push_str("; sync endpoint set from backup");
    }
    line
}
