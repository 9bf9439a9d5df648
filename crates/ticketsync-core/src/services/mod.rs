//! Async service wrappers shared across clients.

mod store;

pub use store::TicketStore;
