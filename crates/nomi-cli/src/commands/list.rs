use std::path::Path;

use nomi_core::models::validate_date;
use nomi_core::DrinkingRecord;

use crate::commands::common::{
    format_record_lines, open_database, record_to_list_item, RecordListItem,
};
use crate::error::CliError;

/// Which records `nomi list` shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub date: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub include_deleted: bool,
}

pub async fn run_list(
    filter: &ListFilter,
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let settings = db.load_settings().await?;
    let mut records = list_records(filter, &db).await?;
    records.truncate(limit);

    if as_json {
        let json_items = records
            .iter()
            .map(record_to_list_item)
            .collect::<Vec<RecordListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if records.is_empty() {
        println!("No records.");
    } else {
        for line in format_record_lines(&records, &settings) {
            println!("{line}");
        }
    }

    Ok(())
}

/// Newest first. Date filters only ever return live records.
pub async fn list_records(
    filter: &ListFilter,
    db: &nomi_core::DatabaseService,
) -> Result<Vec<DrinkingRecord>, CliError> {
    if let Some(date) = &filter.date {
        validate_date(date)?;
        return Ok(db.list_records_by_date(date).await?);
    }

    match (&filter.from, &filter.to) {
        (None, None) => Ok(db.list_records(filter.include_deleted).await?),
        (from, to) => {
            let from = from.as_deref().unwrap_or("0001-01-01");
            let to = to.as_deref().unwrap_or("9999-12-31");
            validate_date(from)?;
            validate_date(to)?;
            if from > to {
                return Err(CliError::InvalidRange(format!("{from} is after {to}")));
            }
            Ok(db.list_records_between(from, to).await?)
        }
    }
}
