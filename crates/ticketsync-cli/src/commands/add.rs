use ticketsync_core::NewTicket;

use crate::cli::StatusArg;
use crate::commands::common::{resolve_ticket_fields, App};
use crate::error::CliError;

pub async fn run_add(
    title_parts: &[String],
    description: Option<&str>,
    status: StatusArg,
    app: &App,
) -> Result<(), CliError> {
    let (title, description) = resolve_ticket_fields(title_parts, description)?;

    let ticket = app
        .controller
        .create(NewTicket::new(title, description, status.into()))
        .await?;
    app.controller.settle().await;

    println!("{}", ticket.id);
    Ok(())
}
