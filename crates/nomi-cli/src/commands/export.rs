use std::path::{Path, PathBuf};

use nomi_core::backup::{export_backup, render_backup, suggested_backup_file_name};

use crate::commands::common::{open_database, today};
use crate::error::CliError;

pub async fn run_export(output_path: Option<&Path>, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let document = export_backup(&db).await?;
    let rendered = render_backup(&document)?;

    if let Some(path) = output_path {
        let path = backup_target(path);
        std::fs::write(&path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}

/// A directory target gets the dated default file name.
pub fn backup_target(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(suggested_backup_file_name(today()))
    } else {
        path.to_path_buf()
    }
}
