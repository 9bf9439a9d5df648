use ticketsync_core::TicketPatch;

use crate::cli::StatusArg;
use crate::commands::common::{
    capture_editor_input_with_initial, normalize_ticket_identifier, resolve_ticket, App,
};
use crate::error::CliError;

pub fn build_patch(
    title: Option<String>,
    description: Option<String>,
    status: Option<StatusArg>,
) -> TicketPatch {
    TicketPatch {
        title,
        description,
        status: status.map(Into::into),
    }
}

pub async fn run_edit(id: &str, patch: TicketPatch, app: &App) -> Result<(), CliError> {
    let normalized_id = normalize_ticket_identifier(id)?;
    let ticket = resolve_ticket(&normalized_id, app.controller.store()).await?;

    let patch = if patch.is_empty() {
        let edited = capture_editor_input_with_initial(&ticket.description)?;
        if edited == ticket.description {
            println!("{}", ticket.id);
            return Ok(());
        }
        patch.description(edited)
    } else {
        patch
    };

    let updated = app.controller.update(&ticket.id, patch).await?;
    app.controller.settle().await;
    println!("{}", updated.id);
    Ok(())
}
