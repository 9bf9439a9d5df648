//! Remote ticket service contract.
//!
//! The server owns ticket ids and canonical timestamps. The sync engine only
//! talks to it through [`RemoteTicketService`], so tests can substitute an
//! in-memory fake.

mod http;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewTicket, ServerTicket, ServerTicketPayload, TicketPatch};

pub use http::HttpTicketApi;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Ticket API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Ticket API error: {message} ({status})")]
    Api { status: u16, message: String },
    #[error("Ticket not found on server: {0}")]
    NotFound(String),
    #[error("Invalid ticket API payload: {0}")]
    InvalidPayload(String),
    #[error("Invalid ticket API configuration: {0}")]
    InvalidConfiguration(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

impl RemoteError {
    /// Network failures, timeouts, throttling and 5xx responses.
    ///
    /// Only used for reporting: every push failure is retried next cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status >= 500 || matches!(status, 408 | 429),
            Self::NotFound(_) | Self::InvalidPayload(_) | Self::InvalidConfiguration(_) => false,
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(error) => error.status().map(|status| status.as_u16()),
            Self::Api { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::InvalidPayload(_) | Self::InvalidConfiguration(_) => None,
        }
    }
}

/// CRUD surface of the remote ticket API
#[async_trait]
pub trait RemoteTicketService: Send + Sync {
    /// Full current ticket list, unvalidated.
    ///
    /// Returned raw so the pull phase can quarantine individual bad records
    /// without failing the whole list.
    async fn list_all(&self) -> RemoteResult<Vec<ServerTicketPayload>>;

    async fn get(&self, id: &str) -> RemoteResult<ServerTicket>;

    async fn create(&self, ticket: &NewTicket) -> RemoteResult<ServerTicket>;

    async fn update(&self, id: &str, patch: &TicketPatch) -> RemoteResult<ServerTicket>;

    /// Not used by the sync engine: local deletions are not propagated.
    async fn delete(&self, id: &str) -> RemoteResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_transient_errors() {
        let unavailable = RemoteError::Api {
            status: 503,
            message: "down".to_string(),
        };
        let throttled = RemoteError::Api {
            status: 429,
            message: "slow down".to_string(),
        };
        let rejected = RemoteError::Api {
            status: 400,
            message: "Title is required".to_string(),
        };

        assert!(unavailable.is_transient());
        assert!(throttled.is_transient());
        assert!(!rejected.is_transient());
        assert!(!RemoteError::NotFound("x".to_string()).is_transient());
        assert_eq!(RemoteError::NotFound("x".to_string()).status(), Some(404));
    }
}
