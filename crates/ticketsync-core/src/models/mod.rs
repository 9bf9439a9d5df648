//! Data models for ticketsync

mod server_ticket;
mod ticket;

pub use server_ticket::{PayloadError, ServerTicket, ServerTicketPayload};
pub use ticket::{
    FieldError, NewTicket, ParseStatusError, Ticket, TicketId, TicketPatch, TicketStatus,
    MAX_DESCRIPTION_LEN, MAX_TITLE_LEN,
};
