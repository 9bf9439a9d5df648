//! Server-side ticket model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ticket::{normalize_description, normalize_title, FieldError, TicketStatus};

/// A ticket as owned by the remote ticket service.
///
/// The server is the sole assigner of `id` and of the canonical `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerTicket {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServerTicket {
    /// Server `updated_at` in Unix ms, comparable with local replica timestamps
    #[must_use]
    pub fn updated_at_millis(&self) -> i64 {
        self.updated_at.timestamp_millis()
    }
}

/// Ticket exactly as it appears on the wire, before boundary validation
#[derive(Debug, Clone, Deserialize)]
pub struct ServerTicketPayload {
    pub id: Option<String>,
    pub title: String,
    /// May be missing or null on the wire; such records are quarantined
    #[serde(default)]
    pub description: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&ServerTicket> for ServerTicketPayload {
    fn from(ticket: &ServerTicket) -> Self {
        Self {
            id: Some(ticket.id.clone()),
            title: ticket.title.clone(),
            description: Some(ticket.description.clone()),
            status: ticket.status.as_str().to_string(),
            created_at: ticket.created_at.to_rfc3339(),
            updated_at: ticket.updated_at.to_rfc3339(),
        }
    }
}

/// Why a server payload was quarantined
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("server ticket is missing an id")]
    MissingId,
    #[error(transparent)]
    Status(#[from] super::ticket::ParseStatusError),
    #[error("invalid {field} timestamp '{value}'")]
    Timestamp { field: &'static str, value: String },
    #[error(transparent)]
    Field(#[from] FieldError),
}

impl TryFrom<ServerTicketPayload> for ServerTicket {
    type Error = PayloadError;

    fn try_from(value: ServerTicketPayload) -> Result<Self, Self::Error> {
        let id = value
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(PayloadError::MissingId)?;

        let description = value.description.as_deref().unwrap_or_default();

        Ok(Self {
            id,
            title: normalize_title(&value.title)?,
            description: normalize_description(description)?,
            status: value.status.parse()?,
            created_at: parse_timestamp("created_at", &value.created_at)?,
            updated_at: parse_timestamp("updated_at", &value.updated_at)?,
        })
    }
}

fn parse_timestamp(field: &'static str, raw: &str) -> Result<DateTime<Utc>, PayloadError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| PayloadError::Timestamp {
            field,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(status: &str) -> ServerTicketPayload {
        serde_json::from_value(serde_json::json!({
            "id": "6f1c7a52-3c1d-4d7e-9b0a-2b8b1c9a0001",
            "title": "Server ticket",
            "description": "From the API",
            "status": status,
            "user_id": null,
            "created_at": "2025-03-01T10:00:00.000Z",
            "updated_at": "2025-03-01T12:30:00.500Z"
        }))
        .unwrap()
    }

    #[test]
    fn parses_valid_payload() {
        let ticket = ServerTicket::try_from(payload("in_progress")).unwrap();
        assert_eq!(ticket.status, TicketStatus::InProgress);
        assert_eq!(ticket.updated_at_millis(), 1_740_832_200_500);
    }

    #[test]
    fn quarantines_unknown_status() {
        let error = ServerTicket::try_from(payload("blocked")).unwrap_err();
        assert!(matches!(error, PayloadError::Status(_)));
    }

    #[test]
    fn rejects_missing_id_and_bad_timestamps() {
        let mut missing_id = payload("todo");
        missing_id.id = Some("  ".to_string());
        assert_eq!(
            ServerTicket::try_from(missing_id).unwrap_err(),
            PayloadError::MissingId
        );

        let mut bad_time = payload("todo");
        bad_time.updated_at = "yesterday".to_string();
        assert!(matches!(
            ServerTicket::try_from(bad_time).unwrap_err(),
            PayloadError::Timestamp {
                field: "updated_at",
                ..
            }
        ));
    }

    #[test]
    fn quarantines_fields_the_api_would_reject() {
        let mut no_description = payload("todo");
        no_description.description = None;
        assert_eq!(
            ServerTicket::try_from(no_description).unwrap_err(),
            PayloadError::Field(FieldError::Empty("description"))
        );

        let mut blank_title = payload("done");
        blank_title.title = "   ".to_string();
        assert_eq!(
            ServerTicket::try_from(blank_title).unwrap_err(),
            PayloadError::Field(FieldError::Empty("title"))
        );

        let mut long_title = payload("todo");
        long_title.title = "x".repeat(256);
        assert!(matches!(
            ServerTicket::try_from(long_title).unwrap_err(),
            PayloadError::Field(FieldError::TooLong { field: "title", .. })
        ));
    }

    #[test]
    fn trims_accepted_fields() {
        let mut padded = payload("todo");
        padded.title = "  Padded  ".to_string();
        let ticket = ServerTicket::try_from(padded).unwrap();
        assert_eq!(ticket.title, "Padded");
        assert_eq!(ticket.description, "From the API");
    }
}
