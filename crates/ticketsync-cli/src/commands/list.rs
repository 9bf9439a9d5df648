use ticketsync_core::Ticket;

use crate::cli::StatusArg;
use crate::commands::common::{format_ticket_lines, ticket_to_list_item, App, TicketListItem};
use crate::error::CliError;

pub async fn list_tickets(status: Option<StatusArg>, app: &App) -> Vec<Ticket> {
    match status {
        Some(status) => app.controller.list_by_status(status.into()).await,
        None => app.controller.list().await,
    }
}

pub async fn run_list(
    status: Option<StatusArg>,
    as_json: bool,
    app: &App,
) -> Result<(), CliError> {
    let tickets = list_tickets(status, app).await;

    if as_json {
        let json_items = tickets
            .iter()
            .map(ticket_to_list_item)
            .collect::<Vec<TicketListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_ticket_lines(&tickets) {
            println!("{line}");
        }
    }

    Ok(())
}
