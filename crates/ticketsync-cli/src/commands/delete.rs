use crate::commands::common::{normalize_ticket_identifier, resolve_ticket, App};
use crate::error::CliError;

pub async fn run_delete(id: &str, app: &App) -> Result<(), CliError> {
    let normalized_id = normalize_ticket_identifier(id)?;
    let ticket = resolve_ticket(&normalized_id, app.controller.store()).await?;

    app.controller.delete(&ticket.id).await?;
    println!("{}", ticket.id);
    Ok(())
}
