use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] ticketsync_core::Error),
    #[error(transparent)]
    Remote(#[from] ticketsync_core::RemoteError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No ticket title provided")]
    EmptyTitle,
    #[error("Ticket ID cannot be empty")]
    EmptyTicketId,
    #[error("Ticket not found for id/prefix: {0}")]
    TicketNotFound(String),
    #[error("{0}")]
    AmbiguousTicketId(String),
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Sync is not configured. Pass --api-url, set TICKETSYNC_API_URL, or add api_base_url to the config file."
    )]
    SyncNotConfigured,
}
