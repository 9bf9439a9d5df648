use serde::Serialize;
use ticketsync_core::SyncState;

use crate::commands::common::App;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub online: bool,
    pub sync_state: SyncState,
    pub api_base_url: Option<String>,
    pub db_path: Option<String>,
    pub tickets: usize,
    pub unsynced: usize,
}

pub async fn status_report(app: &App) -> StatusReport {
    let controller = &app.controller;
    StatusReport {
        online: controller.is_online(),
        sync_state: controller.sync_state(),
        api_base_url: app.api_base_url.clone(),
        db_path: controller
            .store()
            .db_path()
            .map(|path| path.display().to_string()),
        tickets: controller.list().await.len(),
        unsynced: controller.unsynced_count().await,
    }
}

pub async fn run_status(as_json: bool, app: &App) -> Result<(), CliError> {
    let report = status_report(app).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let connection = if report.online { "online" } else { "offline" };
    println!("Connection: {connection} ({})", report.sync_state);
    println!(
        "API:        {}",
        report.api_base_url.as_deref().unwrap_or("not configured")
    );
    if let Some(path) = &report.db_path {
        println!("Database:   {path}");
    }
    println!(
        "Tickets:    {} ({} waiting to sync)",
        report.tickets, report.unsynced
    );
    Ok(())
}
