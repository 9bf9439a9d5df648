//! Merge rules for one reconciliation cycle.
//!
//! Kept free of I/O so the decision table can be tested on its own.

use crate::db::TicketRepository;
use crate::models::{NewTicket, ServerTicket, Ticket, TicketId, TicketPatch};
use crate::Result;

/// What the push phase sends for a dirty replica
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushAction {
    /// Never accepted by the server: create it
    Create(NewTicket),
    /// Already linked: send every current field
    Update {
        server_id: String,
        patch: TicketPatch,
    },
}

pub fn plan_push(ticket: &Ticket) -> PushAction {
    match &ticket.server_id {
        None => PushAction::Create(NewTicket::new(
            ticket.title.clone(),
            ticket.description.clone(),
            ticket.status,
        )),
        Some(server_id) => PushAction::Update {
            server_id: server_id.clone(),
            patch: TicketPatch::full(ticket),
        },
    }
}

/// What the pull phase does with one server ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullAction {
    /// No replica carries this `server_id`
    Insert,
    /// Server is strictly newer and the replica is clean
    Overwrite(TicketId),
    /// Server is newer but the replica has unpushed edits; local wins
    KeepLocal(TicketId),
    /// Server is not newer than the replica
    UpToDate(TicketId),
}

pub fn decide_pull(local: Option<&Ticket>, server: &ServerTicket) -> PullAction {
    let Some(local) = local else {
        return PullAction::Insert;
    };

    if server.updated_at_millis() <= local.updated_at {
        PullAction::UpToDate(local.id)
    } else if local.is_synced {
        PullAction::Overwrite(local.id)
    } else {
        PullAction::KeepLocal(local.id)
    }
}

/// Counts produced by [`apply_pull`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullSummary {
    pub inserted: usize,
    pub overwritten: usize,
    pub kept_local: usize,
}

/// Merge the server list into the local store.
///
/// Replicas without a server counterpart are never removed.
pub fn apply_pull(
    repo: &impl TicketRepository,
    server_tickets: &[ServerTicket],
) -> Result<PullSummary> {
    let mut summary = PullSummary::default();

    for server in server_tickets {
        let local = repo.find_by_server_id(&server.id)?;
        match decide_pull(local.as_ref(), server) {
            PullAction::Insert => {
                let inserted = repo.insert_from_server(server)?;
                tracing::debug!(
                    ticket_id = %inserted.id,
                    server_id = %server.id,
                    "Pulled new ticket"
                );
                summary.inserted += 1;
            }
            PullAction::Overwrite(id) => {
                if repo.apply_server_fields(&id, server)? {
                    summary.overwritten += 1;
                }
            }
            PullAction::KeepLocal(id) => {
                tracing::debug!(
                    ticket_id = %id,
                    server_id = %server.id,
                    "Server copy is newer but local edits are unpushed; keeping local"
                );
                summary.kept_local += 1;
            }
            PullAction::UpToDate(_) => {}
        }
    }

    Ok(summary)
}
