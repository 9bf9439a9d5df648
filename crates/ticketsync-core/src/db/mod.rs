//! Local record store for ticket replicas

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::{SqliteTicketRepository, TicketFilter, TicketRepository};
