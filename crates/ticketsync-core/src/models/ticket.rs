//! Ticket replica model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Maximum title length accepted by the ticket API
pub const MAX_TITLE_LEN: usize = 255;
/// Maximum description length accepted by the ticket API
pub const MAX_DESCRIPTION_LEN: usize = 2000;

/// A local identifier for a ticket replica, using UUID v7 (time-sortable).
///
/// Never sent to the server; `server_id` is the join key with remote tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(Uuid);

impl TicketId {
    /// Create a new unique ticket ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TicketId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Kanban column a ticket sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Todo,
    InProgress,
    Done,
}

/// Returned when a status string is not one of `todo`, `in_progress`, `done`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown ticket status '{0}' (expected todo, in_progress or done)")]
pub struct ParseStatusError(pub String);

impl TicketStatus {
    /// Column order on the board
    pub const ALL: [Self; 3] = [Self::Todo, Self::InProgress, Self::Done];

    /// Storage and wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    /// Human-readable column label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// A local replica of a ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Local identifier, stable for the lifetime of the replica
    pub id: TicketId,
    /// Server-assigned identifier; `None` until the first successful push
    pub server_id: Option<String>,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    /// True iff the fields are known to match the last-seen server version
    pub is_synced: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last local mutation timestamp (Unix ms)
    pub updated_at: i64,
}

impl Ticket {
    /// Whether the replica carries changes not yet pushed
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        !self.is_synced
    }
}

/// Fields for a new ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
}

impl NewTicket {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        status: TicketStatus,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            status,
        }
    }

    /// Trim and validate every field, returning the normalized payload
    pub fn validated(&self) -> Result<Self> {
        Ok(Self {
            title: validate_title(&self.title)?,
            description: validate_description(&self.description)?,
            status: self.status,
        })
    }
}

/// Partial update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
}

impl TicketPatch {
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub const fn status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// A patch carrying every field of the replica, as sent on push
    #[must_use]
    pub fn full(ticket: &Ticket) -> Self {
        Self {
            title: Some(ticket.title.clone()),
            description: Some(ticket.description.clone()),
            status: Some(ticket.status),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.status.is_none()
    }

    /// Trim and validate the fields that are present
    pub fn validated(&self) -> Result<Self> {
        Ok(Self {
            title: self.title.as_deref().map(validate_title).transpose()?,
            description: self
                .description
                .as_deref()
                .map(validate_description)
                .transpose()?,
            status: self.status,
        })
    }
}

/// A title or description outside the limits the ticket API accepts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{field} must not exceed {max_len} characters")]
    TooLong { field: &'static str, max_len: usize },
}

impl From<FieldError> for Error {
    fn from(error: FieldError) -> Self {
        Self::InvalidInput(error.to_string())
    }
}

/// Trimmed title, or why the API would reject it
pub(crate) fn normalize_title(raw: &str) -> std::result::Result<String, FieldError> {
    normalize_text("title", raw, MAX_TITLE_LEN)
}

/// Trimmed description, or why the API would reject it
pub(crate) fn normalize_description(raw: &str) -> std::result::Result<String, FieldError> {
    normalize_text("description", raw, MAX_DESCRIPTION_LEN)
}

fn validate_title(raw: &str) -> Result<String> {
    Ok(normalize_title(raw)?)
}

fn validate_description(raw: &str) -> Result<String> {
    Ok(normalize_description(raw)?)
}

fn normalize_text(
    field: &'static str,
    raw: &str,
    max_len: usize,
) -> std::result::Result<String, FieldError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(FieldError::Empty(field));
    }
    if value.chars().count() > max_len {
        return Err(FieldError::TooLong { field, max_len });
    }
    Ok(value.to_string())
}
