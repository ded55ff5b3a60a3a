use thiserror::Error;

/// Failures surfaced by the sync client, engine and orchestrator.
///
/// An outdated remote is not an error; see [`super::RemoteOutcome`].
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Sync endpoint is not configured")]
    NotConfigured,
    #[error("Network is unavailable")]
    Offline,
    #[error("Sync HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sync endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Sync endpoint reported an error: {0}")]
    Remote(String),
    #[error("Invalid sync response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Store(#[from] crate::Error),
}

impl SyncError {
    /// True for failures of the network round-trip itself, as opposed to
    /// the remote refusing the request or the local store failing.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Offline | Self::Http(_) | Self::Status { .. })
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
