use ticketsync_core::TicketPatch;

use crate::cli::StatusArg;
use crate::commands::common::{normalize_ticket_identifier, resolve_ticket, App};
use crate::error::CliError;

pub async fn run_move(id: &str, status: StatusArg, app: &App) -> Result<(), CliError> {
    let normalized_id = normalize_ticket_identifier(id)?;
    let ticket = resolve_ticket(&normalized_id, app.controller.store()).await?;

    let updated = app
        .controller
        .update(&ticket.id, TicketPatch::default().status(status.into()))
        .await?;
    app.controller.settle().await;

    println!("{} -> {}", updated.id, updated.status.label());
    Ok(())
}
