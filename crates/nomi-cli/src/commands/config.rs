use std::env;
use std::path::Path;

use nomi_core::config::normalize_endpoint;
use nomi_core::SyncConfig;

use crate::commands::common::{load_sync_config, open_database, ENV_ENDPOINT_URL};
use crate::error::CliError;

pub async fn run_config_set_url(url: &str, db_path: &Path) -> Result<(), CliError> {
    let endpoint = normalize_endpoint(url)?;
    let db = open_database(db_path).await?;
    let mut config = SyncConfig::load(&db).await?;
    config.endpoint_url = Some(endpoint);
    config.save(&db).await?;

    println!("Sync endpoint saved");
    Ok(())
}

pub async fn run_config_clear_url(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let mut config = SyncConfig::load(&db).await?;
    config.endpoint_url = None;
    config.save(&db).await?;

    println!("Sync endpoint cleared");
    Ok(())
}

pub async fn run_config_show(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let config = load_sync_config(&db).await?;
    let overridden = env::var(ENV_ENDPOINT_URL).is_ok_and(|value| !value.trim().is_empty());

    for line in format_config_lines(&config, db_path, overridden) {
        println!("{line}");
    }
    Ok(())
}

/// The endpoint URL is the remote's only credential, so it is never printed.
pub fn format_config_lines(config: &SyncConfig, db_path: &Path, overridden: bool) -> Vec<String> {
    let endpoint = match (config.is_configured(), overridden) {
        (true, true) => format!("configured (from {ENV_ENDPOINT_URL})"),
        (true, false) => "configured".to_string(),
        (false, _) => "not configured".to_string(),
    };

    vec![
        format!("Database: {}", db_path.display()),
        format!("Endpoint: {endpoint}"),
        format!(
            "Last sync: {}",
            config.last_sync_at.as_deref().unwrap_or("never")
        ),
        format!("Request timeout: {}s", config.request_timeout.as_secs()),
        format!("Required remote version: {}", config.required_version),
    ]
}
