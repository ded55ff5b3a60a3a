use std::path::Path;

use nomi_core::backup::reset_local_data;

use crate::commands::common::open_database;
use crate::error::CliError;

pub async fn run_reset(confirmed: bool, db_path: &Path) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::ResetNotConfirmed);
    }

    let db = open_database(db_path).await?;
    let removed = reset_local_data(&db).await?;
    println!("Removed {removed} records");
    Ok(())
}
