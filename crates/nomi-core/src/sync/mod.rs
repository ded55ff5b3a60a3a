//! Bidirectional sync with a spreadsheet-backed remote endpoint.
//!
//! [`RemoteClient`] speaks the wire protocol and enforces the version gate,
//! [`SyncEngine`] reconciles the local store with the remote under
//! last-writer-wins, and [`SyncOrchestrator`] sequences passes and
//! broadcasts [`StatusEvent`]s.

mod client;
mod engine;
mod error;
mod orchestrator;
mod protocol;
#[cfg(test)]
mod testing;

pub use client::{
    HttpTransport, RemoteClient, RemoteOutcome, SaveAck, SyncTransport, VersionMismatch,
};
pub use engine::{
    compare_updated_at, remote_wins, settings_payload, PullReport, PushReport, SettingsReport,
    SyncEngine,
};
pub use error::{SyncError, SyncResult};
pub use orchestrator::{
    AlwaysOnline, Connectivity, SkipReason, StatusBroadcaster, StatusEvent, StatusTimings,
    SyncOrchestrator, SyncRun, SyncStatus, SyncSummary, Trigger,
};
pub use protocol::{
    decode_remote_record, normalize_date, version_supported, API_VERSION,
    REQUIRED_REMOTE_VERSION,
};
