use std::io;

use nomi_core::sync::{SyncError, VersionMismatch};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] nomi_core::Error),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Record ID cannot be empty")]
    EmptyRecordId,
    #[error("Record not found for id/prefix: {0}")]
    RecordNotFound(String),
    #[error("{0}")]
    AmbiguousRecordId(String),
    #[error("Unknown drink type: {0}")]
    UnknownDrinkType(String),
    #[error("No amount given and drink type '{0}' has no default amount; pass --amount")]
    MissingAmount(String),
    #[error("Nothing to change; pass at least one field")]
    EmptyEdit,
    #[error("Invalid date range: {0}")]
    InvalidRange(String),
    #[error("Could not determine a data directory; pass --db-path or set NOMI_DB_PATH")]
    NoDataDir,
    #[error("Refusing to reset without --yes")]
    ResetNotConfirmed,
    #[error("Sync is not configured. Run `nomi config set-url <URL>` or set NOMI_ENDPOINT_URL.")]
    SyncNotConfigured,
    #[error("Update required: {0}. Redeploy the latest remote script.")]
    UpdateRequired(VersionMismatch),
}
