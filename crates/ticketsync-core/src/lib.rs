//! ticketsync-core - Core library for ticketsync
//!
//! This crate contains the ticket models, the local record store, the remote
//! ticket API contract, and the offline-first sync engine shared by every
//! ticketsync client.

pub mod config;
pub mod connectivity;
pub mod controller;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod state;
pub mod sync;
pub mod util;

pub use config::ClientConfig;
pub use connectivity::ConnectivityMonitor;
pub use controller::{BoardColumn, TicketController};
pub use error::{Error, Result};
pub use models::{NewTicket, ServerTicket, Ticket, TicketId, TicketPatch, TicketStatus};
pub use remote::{HttpTicketApi, RemoteError, RemoteTicketService};
pub use services::TicketStore;
pub use state::SyncState;
pub use sync::{SkipReason, SyncEngine, SyncOutcome, SyncReport};
