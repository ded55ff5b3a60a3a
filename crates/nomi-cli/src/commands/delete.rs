use std::path::Path;

use crate::commands::common::{
    normalize_record_identifier, open_database, resolve_record, sync_after_change,
};
use crate::error::CliError;

pub async fn run_delete(id: &str, db_path: &Path, no_sync: bool) -> Result<(), CliError> {
    let normalized_id = normalize_record_identifier(id)?;
    let db = open_database(db_path).await?;
    let record = resolve_record(&normalized_id, &db).await?;

    db.delete_record(&record.id).await?;
    println!("{}", record.id);
    sync_after_change(&db, no_sync).await;
    Ok(())
}
