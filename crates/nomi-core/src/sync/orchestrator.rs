//! Sequences sync passes and broadcasts their status.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::client::{RemoteOutcome, SyncTransport, VersionMismatch};
use super::engine::{PullReport, PushReport, SettingsReport, SyncEngine};
use super::error::{SyncError, SyncResult};

const STATUS_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Success,
    Error,
    UpdateRequired,
}

impl SyncStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Syncing => "syncing",
            Self::Success => "success",
            Self::Error => "error",
            Self::UpdateRequired => "update_required",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub status: SyncStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusEvent {
    pub const fn new(status: SyncStatus) -> Self {
        Self {
            status,
            message: None,
        }
    }

    pub fn with_message(status: SyncStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
        }
    }
}

/// How long a terminal status stays up before the automatic return to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTimings {
    pub success: Duration,
    pub error: Duration,
    pub update_required: Duration,
}

impl Default for StatusTimings {
    fn default() -> Self {
        Self {
            success: Duration::from_secs(3),
            error: Duration::from_secs(3),
            update_required: Duration::from_secs(5),
        }
    }
}

impl StatusTimings {
    const fn hold_for(&self, status: SyncStatus) -> Option<Duration> {
        match status {
            SyncStatus::Success => Some(self.success),
            SyncStatus::Error => Some(self.error),
            SyncStatus::UpdateRequired => Some(self.update_required),
            SyncStatus::Idle | SyncStatus::Syncing => None,
        }
    }
}

/// Fan-out of status events with automatic reset to idle.
///
/// Each emission bumps a generation counter; a pending reset only fires if
/// nothing was emitted after the status it belongs to.
#[derive(Clone)]
pub struct StatusBroadcaster {
    sender: broadcast::Sender<StatusEvent>,
    generation: Arc<AtomicU64>,
    timings: StatusTimings,
}

impl StatusBroadcaster {
    pub fn new(timings: StatusTimings) -> Self {
        let (sender, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            sender,
            generation: Arc::new(AtomicU64::new(0)),
            timings,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }

    /// Publish `event`, scheduling the return to idle for terminal states.
    pub fn emit(&self, event: StatusEvent) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let hold = self.timings.hold_for(event.status);
        tracing::debug!(status = %event.status, "Sync status changed");
        // No subscribers is not an error.
        let _ = self.sender.send(event);

        if let Some(hold) = hold {
            let sender = self.sender.clone();
            let current = Arc::clone(&self.generation);
            tokio::spawn(async move {
                tokio::time::sleep(hold).await;
                if current
                    .compare_exchange(generation, generation + 1, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    let _ = sender.send(StatusEvent::new(SyncStatus::Idle));
                }
            });
        }
    }
}

/// Answers whether the network is reachable right now.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

impl<F> Connectivity for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_online(&self) -> bool {
        self()
    }
}

/// Who asked for a sync. Background passes stay silent when offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Background,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotConfigured,
    Offline,
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub pushed: usize,
    pub pulled: usize,
    pub settings_pushed: usize,
    pub settings_pulled: usize,
}

impl SyncSummary {
    const fn records_changed(&self) -> usize {
        self.pushed + self.pulled
    }

    /// Settings pushes resend every key, so only pulled settings count.
    const fn local_changes(&self) -> usize {
        self.pushed + self.pulled + self.settings_pulled
    }
}

/// How a sync attempt ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncRun {
    Skipped(SkipReason),
    Completed(SyncSummary),
    UpdateRequired(VersionMismatch),
}

struct Inner<T> {
    engine: SyncEngine<T>,
    status: StatusBroadcaster,
    connectivity: Box<dyn Connectivity>,
    in_flight: AtomicBool,
}

/// Drives [`SyncEngine`] passes: entry guards, single-flight, and status.
pub struct SyncOrchestrator<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for SyncOrchestrator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<T: SyncTransport + 'static> SyncOrchestrator<T> {
    pub fn new(engine: SyncEngine<T>) -> Self {
        Self::with_options(engine, AlwaysOnline, StatusTimings::default())
    }

    pub fn with_options(
        engine: SyncEngine<T>,
        connectivity: impl Connectivity + 'static,
        timings: StatusTimings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine,
                status: StatusBroadcaster::new(timings),
                connectivity: Box::new(connectivity),
                in_flight: AtomicBool::new(false),
            }),
        }
    }

    pub fn engine(&self) -> &SyncEngine<T> {
        &self.inner.engine
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.inner.status.subscribe()
    }

    /// Push, then pull everything touched since the last sync recorded
    /// before the push started.
    pub async fn sync(&self, trigger: Trigger) -> SyncResult<SyncRun> {
        let _guard = match self.enter(trigger).await? {
            Entry::Go(guard) => guard,
            Entry::Skip(reason) => return Ok(SyncRun::Skipped(reason)),
        };

        self.emit(StatusEvent::new(SyncStatus::Syncing));
        let outcome = self.bidirectional().await;
        self.finish(outcome, SyncSummary::records_changed)
    }

    /// Record push, record pull (full), settings push and settings pull,
    /// run concurrently. Each keeps its own atomicity.
    pub async fn full_sync(&self) -> SyncResult<SyncRun> {
        let _guard = match self.enter(Trigger::User).await? {
            Entry::Go(guard) => guard,
            Entry::Skip(reason) => return Ok(SyncRun::Skipped(reason)),
        };

        self.emit(StatusEvent::new(SyncStatus::Syncing));
        let engine = &self.inner.engine;
        let (pushed, pulled, settings_pushed, settings_pulled) = tokio::join!(
            engine.push_records(),
            engine.pull_records(None),
            engine.push_settings(),
            engine.pull_settings(),
        );

        let outcome = combine_full(pushed, pulled, settings_pushed, settings_pulled);
        self.finish(outcome, SyncSummary::local_changes)
    }

    /// Fire-and-forget background sync. Failures only surface as status
    /// events.
    pub fn try_sync(&self) -> JoinHandle<()> {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            if let Err(error) = orchestrator.sync(Trigger::Background).await {
                tracing::warn!("Background sync failed: {error}");
            }
        })
    }

    async fn enter(&self, trigger: Trigger) -> SyncResult<Entry<'_>> {
        if !self.inner.engine.is_configured().await {
            tracing::debug!("Sync skipped: endpoint not configured");
            return Ok(Entry::Skip(SkipReason::NotConfigured));
        }

        if !self.inner.connectivity.is_online() {
            return match trigger {
                Trigger::Background => {
                    tracing::debug!("Sync skipped: offline");
                    Ok(Entry::Skip(SkipReason::Offline))
                }
                Trigger::User => {
                    let error = SyncError::Offline;
                    self.emit(StatusEvent::with_message(
                        SyncStatus::Error,
                        failure_message(&error),
                    ));
                    Err(error)
                }
            };
        }

        match FlightGuard::acquire(&self.inner.in_flight) {
            Some(guard) => Ok(Entry::Go(guard)),
            None => {
                tracing::debug!("Sync skipped: already running");
                Ok(Entry::Skip(SkipReason::AlreadyRunning))
            }
        }
    }

    async fn bidirectional(&self) -> SyncResult<RemoteOutcome<SyncSummary>> {
        let engine = &self.inner.engine;
        let since = engine.last_sync_at().await;

        let pushed = match engine.push_records().await? {
            RemoteOutcome::Applied(report) => report,
            RemoteOutcome::UpdateRequired(mismatch) => {
                return Ok(RemoteOutcome::UpdateRequired(mismatch))
            }
        };
        let pulled = match engine.pull_records(since.as_deref()).await? {
            RemoteOutcome::Applied(report) => report,
            RemoteOutcome::UpdateRequired(mismatch) => {
                return Ok(RemoteOutcome::UpdateRequired(mismatch))
            }
        };

        Ok(RemoteOutcome::Applied(SyncSummary {
            pushed: pushed.updated,
            pulled: pulled.merged,
            ..SyncSummary::default()
        }))
    }

    fn finish(
        &self,
        outcome: SyncResult<RemoteOutcome<SyncSummary>>,
        changed: fn(&SyncSummary) -> usize,
    ) -> SyncResult<SyncRun> {
        match outcome {
            Ok(RemoteOutcome::Applied(summary)) => {
                if changed(&summary) > 0 {
                    self.emit(StatusEvent::with_message(
                        SyncStatus::Success,
                        success_message(&summary),
                    ));
                } else {
                    self.emit(StatusEvent::new(SyncStatus::Idle));
                }
                Ok(SyncRun::Completed(summary))
            }
            Ok(RemoteOutcome::UpdateRequired(mismatch)) => {
                self.emit(StatusEvent::with_message(
                    SyncStatus::UpdateRequired,
                    format!("Update the remote script: {mismatch}"),
                ));
                Ok(SyncRun::UpdateRequired(mismatch))
            }
            Err(error) => {
                tracing::warn!("Sync failed: {error}");
                self.emit(StatusEvent::with_message(
                    SyncStatus::Error,
                    failure_message(&error),
                ));
                Err(error)
            }
        }
    }

    fn emit(&self, event: StatusEvent) {
        self.inner.status.emit(event);
    }
}

enum Entry<'a> {
    Go(FlightGuard<'a>),
    Skip(SkipReason),
}

fn combine_full(
    pushed: SyncResult<RemoteOutcome<PushReport>>,
    pulled: SyncResult<RemoteOutcome<PullReport>>,
    settings_pushed: SyncResult<RemoteOutcome<SettingsReport>>,
    settings_pulled: SyncResult<RemoteOutcome<SettingsReport>>,
) -> SyncResult<RemoteOutcome<SyncSummary>> {
    let outcome = match (pushed?, pulled?, settings_pushed?, settings_pulled?) {
        (
            RemoteOutcome::Applied(pushed),
            RemoteOutcome::Applied(pulled),
            RemoteOutcome::Applied(settings_pushed),
            RemoteOutcome::Applied(settings_pulled),
        ) => RemoteOutcome::Applied(SyncSummary {
            pushed: pushed.updated,
            pulled: pulled.merged,
            settings_pushed: settings_pushed.updated,
            settings_pulled: settings_pulled.updated,
        }),
        (RemoteOutcome::UpdateRequired(mismatch), ..)
        | (_, RemoteOutcome::UpdateRequired(mismatch), ..)
        | (_, _, RemoteOutcome::UpdateRequired(mismatch), _)
        | (.., RemoteOutcome::UpdateRequired(mismatch)) => RemoteOutcome::UpdateRequired(mismatch),
    };
    Ok(outcome)
}

fn success_message(summary: &SyncSummary) -> String {
    let mut message = format!(
        "Synced: {} pushed, {} pulled",
        summary.pushed, summary.pulled
    );
    if summary.settings_pushed + summary.settings_pulled > 0 {
        message.push_str(&format!(
            ", {} settings pushed, {} settings pulled",
            summary.settings_pushed, summary.settings_pulled
        ));
    }
    message
}

fn failure_message(error: &SyncError) -> String {
    if error.is_transport() {
        "Sync failed: could not reach the sync endpoint".to_string()
    } else {
        format!("Sync failed: {error}")
    }
}
