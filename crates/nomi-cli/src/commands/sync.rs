use std::path::Path;

use nomi_core::sync::{
    PullReport, PushReport, RemoteOutcome, SkipReason, StatusEvent, SyncRun, SyncSummary, Trigger,
};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::commands::common::{
    build_orchestrator, drain_status_events, format_status_event, load_sync_config,
    open_database,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SyncStatusItem {
    pub configured: bool,
    pub last_sync_at: Option<String>,
    pub unsynced: usize,
    pub required_version: String,
}

pub async fn run_sync(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let orchestrator = build_orchestrator(&db).await?;
    let mut events = orchestrator.subscribe();
    let result = orchestrator.sync(Trigger::User).await;
    print_status_events(&mut events);
    report_run(result?)
}

pub async fn run_sync_full(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let orchestrator = build_orchestrator(&db).await?;
    let mut events = orchestrator.subscribe();
    let result = orchestrator.full_sync().await;
    print_status_events(&mut events);
    report_run(result?)
}

pub async fn run_sync_push(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let orchestrator = build_orchestrator(&db).await?;

    match orchestrator.engine().push_records().await? {
        RemoteOutcome::Applied(report) => {
            println!("{}", format_push_report(&report));
            Ok(())
        }
        RemoteOutcome::UpdateRequired(mismatch) => Err(CliError::UpdateRequired(mismatch)),
    }
}

pub async fn run_sync_pull(full: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let orchestrator = build_orchestrator(&db).await?;
    let engine = orchestrator.engine();
    let since = if full { None } else { engine.last_sync_at().await };

    match engine.pull_records(since.as_deref()).await? {
        RemoteOutcome::Applied(report) => {
            println!("{}", format_pull_report(&report));
            Ok(())
        }
        RemoteOutcome::UpdateRequired(mismatch) => Err(CliError::UpdateRequired(mismatch)),
    }
}

pub async fn run_sync_status(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let config = load_sync_config(&db).await?;
    let status = SyncStatusItem {
        configured: config.is_configured(),
        last_sync_at: config.last_sync_at.clone(),
        unsynced: db.count_unsynced().await?,
        required_version: config.required_version,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    for line in format_sync_status_lines(&status) {
        println!("{line}");
    }
    Ok(())
}

fn print_status_events(events: &mut broadcast::Receiver<StatusEvent>) {
    for event in drain_status_events(events) {
        println!("{}", format_status_event(&event));
    }
}

fn report_run(run: SyncRun) -> Result<(), CliError> {
    match run {
        SyncRun::Completed(summary) => {
            println!("{}", format_summary(&summary));
            Ok(())
        }
        SyncRun::Skipped(reason) => {
            println!("Sync skipped: {}", describe_skip(reason));
            Ok(())
        }
        SyncRun::UpdateRequired(mismatch) => Err(CliError::UpdateRequired(mismatch)),
    }
}

pub fn format_summary(summary: &SyncSummary) -> String {
    let mut line = format!(
        "Pushed {} records, pulled {} records",
        summary.pushed, summary.pulled
    );
    if summary.settings_pushed > 0 || summary.settings_pulled > 0 {
        line.push_str(&format!(
            ", pushed {} settings, pulled {} settings",
            summary.settings_pushed, summary.settings_pulled
        ));
    }
    line
}

pub fn format_push_report(report: &PushReport) -> String {
    if report.sent == 0 {
        return "Nothing to push".to_string();
    }
    format!(
        "Pushed {} of {} records ({} marked synced)",
        report.updated, report.sent, report.marked
    )
}

pub fn format_pull_report(report: &PullReport) -> String {
    let mut line = format!(
        "Pulled {} records, {} changed locally",
        report.received, report.merged
    );
    if report.skipped > 0 {
        line.push_str(&format!(", {} unreadable rows skipped", report.skipped));
    }
    line
}

pub fn format_sync_status_lines(status: &SyncStatusItem) -> Vec<String> {
    vec![
        format!(
            "Endpoint: {}",
            if status.configured {
                "configured"
            } else {
                "not configured"
            }
        ),
        format!(
            "Last sync: {}",
            status.last_sync_at.as_deref().unwrap_or("never")
        ),
        format!("Unsynced records: {}", status.unsynced),
        format!("Required remote version: {}", status.required_version),
    ]
}

const fn describe_skip(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::NotConfigured => "endpoint not configured",
        SkipReason::Offline => "offline",
        SkipReason::AlreadyRunning => "another sync is running",
    }
}
