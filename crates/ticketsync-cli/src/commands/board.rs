use ticketsync_core::BoardColumn;

use crate::commands::common::{short_id, ticket_preview, App};

pub fn render_board(columns: &[BoardColumn]) -> Vec<String> {
    let mut lines = Vec::new();
    for column in columns {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!("{} ({})", column.status.label(), column.tickets.len()));
        for ticket in &column.tickets {
            let marker = if ticket.is_synced { ' ' } else { '*' };
            lines.push(format!(
                "  {} {marker} {}",
                short_id(&ticket.id.to_string()),
                ticket_preview(&ticket.title, 60)
            ));
        }
    }
    lines
}

pub async fn run_board(app: &App) {
    for line in render_board(&app.controller.board().await) {
        println!("{line}");
    }
}
