//! Ticket repository implementation
//!
//! Every mutating call is a single SQL statement, so each replica write is
//! atomic. Callers that need several writes to land together (the pull merge)
//! run the repository on top of a [`rusqlite::Transaction`].

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use crate::error::{Error, Result};
use crate::models::{NewTicket, ServerTicket, Ticket, TicketId, TicketPatch, TicketStatus};
use crate::util::unix_millis_now;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

const TICKET_COLUMNS: &str =
    "id, server_id, title, description, status, is_synced, created_at, updated_at";

/// Predicate for [`TicketRepository::list_where`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketFilter {
    All,
    Unsynced,
    Status(TicketStatus),
    ServerId(String),
}

/// Trait for ticket replica storage operations
pub trait TicketRepository {
    /// List every replica, oldest first
    fn list(&self) -> Result<Vec<Ticket>>;

    /// List replicas matching a filter, oldest first
    fn list_where(&self, filter: &TicketFilter) -> Result<Vec<Ticket>>;

    /// Get a replica by local ID
    fn get(&self, id: &TicketId) -> Result<Option<Ticket>>;

    /// Get the replica linked to a server ticket
    fn find_by_server_id(&self, server_id: &str) -> Result<Option<Ticket>>;

    /// Create a local-only replica (dirty, unlinked)
    fn create(&self, data: &NewTicket) -> Result<Ticket>;

    /// Apply a local edit; always marks the replica dirty and touches `updated_at`
    fn update(&self, id: &TicketId, patch: &TicketPatch) -> Result<Ticket>;

    /// Permanently remove a replica
    fn delete(&self, id: &TicketId) -> Result<()>;

    /// Number of replicas with unpushed changes
    fn count_unsynced(&self) -> Result<usize>;

    /// Local IDs starting with `prefix`, most recently updated first
    fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>>;

    /// Record the server ID after a successful remote create.
    ///
    /// The replica is marked synced only if it was not edited after
    /// `pushed_updated_at`. Returns whether it ended up synced.
    fn link_server_id(
        &self,
        id: &TicketId,
        server_id: &str,
        pushed_updated_at: i64,
    ) -> Result<bool>;

    /// Mark a replica synced after a successful remote update, unless it was
    /// edited after `pushed_updated_at`. Returns whether it ended up synced.
    fn mark_synced(&self, id: &TicketId, pushed_updated_at: i64) -> Result<bool>;

    /// Insert a replica for a ticket first seen on the server
    fn insert_from_server(&self, server: &ServerTicket) -> Result<Ticket>;

    /// Overwrite a clean replica with server values. Dirty replicas are left
    /// untouched. Returns whether a row changed.
    fn apply_server_fields(&self, id: &TicketId, server: &ServerTicket) -> Result<bool>;
}

/// `SQLite` implementation of `TicketRepository`
pub struct SqliteTicketRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteTicketRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Ticket>> {
        let mut stmt = self.conn.prepare(sql)?;
        let tickets = stmt
            .query_map(params, Self::parse_ticket)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tickets)
    }

    fn query_one(&self, sql: &str, params: impl rusqlite::Params) -> Result<Option<Ticket>> {
        Ok(self
            .conn
            .query_row(sql, params, Self::parse_ticket)
            .optional()?)
    }

    fn insert(&self, ticket: &Ticket) -> Result<()> {
        self.conn.execute(
            &format!("INSERT INTO tickets ({TICKET_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"),
            params![
                ticket.id.as_str(),
                ticket.server_id,
                ticket.title,
                ticket.description,
                ticket.status.as_str(),
                i32::from(ticket.is_synced),
                ticket.created_at,
                ticket.updated_at
            ],
        )?;
        Ok(())
    }

    /// Parse a ticket from a database row
    ///
    /// Unknown status strings surface as conversion errors instead of leaking
    /// into the model.
    fn parse_ticket(row: &rusqlite::Row<'_>) -> rusqlite::Result<Ticket> {
        let id: String = row.get(0)?;
        let status: String = row.get(4)?;
        Ok(Ticket {
            id: id.parse().map_err(|error| {
                rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(error))
            })?,
            server_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            status: status.parse().map_err(|error| {
                rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(error))
            })?,
            is_synced: row.get::<_, i32>(5)? != 0,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl TicketRepository for SqliteTicketRepository<'_> {
    fn list(&self) -> Result<Vec<Ticket>> {
        self.list_where(&TicketFilter::All)
    }

    fn list_where(&self, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        match filter {
            TicketFilter::All => self.query(
                &format!("SELECT {TICKET_COLUMNS} FROM tickets ORDER BY created_at, id"),
                [],
            ),
            TicketFilter::Unsynced => self.query(
                &format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets WHERE is_synced = 0 ORDER BY created_at, id"
                ),
                [],
            ),
            TicketFilter::Status(status) => self.query(
                &format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets WHERE status = ? ORDER BY created_at, id"
                ),
                params![status.as_str()],
            ),
            TicketFilter::ServerId(server_id) => self.query(
                &format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets WHERE server_id = ? ORDER BY created_at, id"
                ),
                params![server_id],
            ),
        }
    }

    fn get(&self, id: &TicketId) -> Result<Option<Ticket>> {
        self.query_one(
            &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?"),
            params![id.as_str()],
        )
    }

    fn find_by_server_id(&self, server_id: &str) -> Result<Option<Ticket>> {
        self.query_one(
            &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE server_id = ?"),
            params![server_id],
        )
    }

    fn create(&self, data: &NewTicket) -> Result<Ticket> {
        let data = data.validated()?;
        let now = unix_millis_now();
        let ticket = Ticket {
            id: TicketId::new(),
            server_id: None,
            title: data.title,
            description: data.description,
            status: data.status,
            is_synced: false,
            created_at: now,
            updated_at: now,
        };

        self.insert(&ticket)?;
        Ok(ticket)
    }

    fn update(&self, id: &TicketId, patch: &TicketPatch) -> Result<Ticket> {
        let patch = patch.validated()?;
        let now = unix_millis_now();

        // No field diffing: an edit with identical values still dirties the row.
        // `updated_at` strictly increases so the push snapshot guard in
        // `link_server_id`/`mark_synced` sees edits made within the same ms.
        let rows = self.conn.execute(
            "UPDATE tickets
             SET title = COALESCE(?, title),
                 description = COALESCE(?, description),
                 status = COALESCE(?, status),
                 is_synced = 0,
                 updated_at = MAX(?, updated_at + 1)
             WHERE id = ?",
            params![
                patch.title,
                patch.description,
                patch.status.map(TicketStatus::as_str),
                now,
                id.as_str()
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        self.get(id)?.ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn delete(&self, id: &TicketId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM tickets WHERE id = ?", params![id.as_str()])?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }

    fn count_unsynced(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tickets WHERE is_synced = 0",
            [],
            |row| row.get(0),
        )?;
        usize::try_from(count).map_err(|error| Error::Database(error.to_string()))
    }

    fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM tickets WHERE id LIKE ? ORDER BY updated_at DESC LIMIT ?",
        )?;
        let ids = stmt
            .query_map(params![format!("{prefix}%"), limit as i64], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    fn link_server_id(
        &self,
        id: &TicketId,
        server_id: &str,
        pushed_updated_at: i64,
    ) -> Result<bool> {
        // The link is recorded even when the row was edited mid-push so the
        // next cycle updates instead of creating a duplicate.
        let rows = self.conn.execute(
            "UPDATE tickets
             SET server_id = ?, is_synced = CASE WHEN updated_at = ? THEN 1 ELSE 0 END
             WHERE id = ?",
            params![server_id, pushed_updated_at, id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(self.get(id)?.is_some_and(|ticket| ticket.is_synced))
    }

    fn mark_synced(&self, id: &TicketId, pushed_updated_at: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE tickets SET is_synced = 1
             WHERE id = ? AND updated_at = ? AND server_id IS NOT NULL",
            params![id.as_str(), pushed_updated_at],
        )?;
        Ok(rows > 0)
    }

    fn insert_from_server(&self, server: &ServerTicket) -> Result<Ticket> {
        // Local timestamps are taken at insert time, not copied from the server
        let now = unix_millis_now();
        let ticket = Ticket {
            id: TicketId::new(),
            server_id: Some(server.id.clone()),
            title: server.title.clone(),
            description: server.description.clone(),
            status: server.status,
            is_synced: true,
            created_at: now,
            updated_at: now,
        };

        self.insert(&ticket)?;
        Ok(ticket)
    }

    fn apply_server_fields(&self, id: &TicketId, server: &ServerTicket) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE tickets
             SET title = ?, description = ?, status = ?, is_synced = 1, updated_at = ?
             WHERE id = ? AND is_synced = 1",
            params![
                server.title,
                server.description,
                server.status.as_str(),
                unix_millis_now(),
                id.as_str()
            ],
        )?;
        Ok(rows > 0)
    }
}
