use ticketsync_core::{SkipReason, SyncOutcome, SyncReport};

use crate::commands::common::App;
use crate::error::CliError;

pub fn format_sync_report(report: &SyncReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Pushed {} ({} created, {} updated), pulled {} new, {} updated",
        report.pushed(),
        report.pushed_created,
        report.pushed_updated,
        report.pulled_inserted,
        report.pulled_overwritten
    )];
    if report.push_failures > 0 {
        lines.push(format!(
            "{} ticket(s) failed to push and will be retried",
            report.push_failures
        ));
    }
    if report.kept_local > 0 {
        lines.push(format!(
            "{} ticket(s) kept local edits over newer server copies",
            report.kept_local
        ));
    }
    if report.quarantined > 0 {
        lines.push(format!(
            "{} server ticket(s) skipped as invalid",
            report.quarantined
        ));
    }
    lines
}

pub async fn run_sync(app: &App) -> Result<(), CliError> {
    if !app.has_remote() {
        return Err(CliError::SyncNotConfigured);
    }

    match app.controller.sync_now().await? {
        SyncOutcome::Skipped {
            reason: SkipReason::Offline,
        } => println!("Offline; local changes stay queued"),
        SyncOutcome::Skipped {
            reason: SkipReason::AlreadySyncing,
        } => println!("A sync is already running"),
        SyncOutcome::Completed(report) => {
            for line in format_sync_report(&report) {
                println!("{line}");
            }
        }
    }
    Ok(())
}
