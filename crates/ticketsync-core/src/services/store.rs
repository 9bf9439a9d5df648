//! Shared ticket store service used by the sync engine and controller.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{Database, SqliteTicketRepository, TicketFilter, TicketRepository};
use crate::models::{NewTicket, Ticket, TicketId, TicketPatch};
use crate::Result;

/// Thread-safe handle to the local record store.
///
/// Cloning is cheap; all clones share one connection and writes are
/// serialized through its lock.
#[derive(Clone)]
pub struct TicketStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl TicketStore {
    /// Open a store at the given filesystem path.
    pub fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        tracing::debug!(path = %db_path.display(), "Opened local ticket store");
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Path of the backing database file, if any.
    pub fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    /// List every replica.
    pub async fn list(&self) -> Result<Vec<Ticket>> {
        let db = self.db.lock().await;
        SqliteTicketRepository::new(db.connection()).list()
    }

    /// List replicas matching a filter.
    pub async fn list_where(&self, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        let db = self.db.lock().await;
        SqliteTicketRepository::new(db.connection()).list_where(filter)
    }

    /// Fetch a replica by local id.
    pub async fn get(&self, id: &TicketId) -> Result<Option<Ticket>> {
        let db = self.db.lock().await;
        SqliteTicketRepository::new(db.connection()).get(id)
    }

    /// Fetch the replica linked to a server ticket.
    pub async fn find_by_server_id(&self, server_id: &str) -> Result<Option<Ticket>> {
        let db = self.db.lock().await;
        SqliteTicketRepository::new(db.connection()).find_by_server_id(server_id)
    }

    /// Create a local-only replica.
    pub async fn create(&self, data: &NewTicket) -> Result<Ticket> {
        let db = self.db.lock().await;
        SqliteTicketRepository::new(db.connection()).create(data)
    }

    /// Apply a local edit.
    pub async fn update(&self, id: &TicketId, patch: &TicketPatch) -> Result<Ticket> {
        let db = self.db.lock().await;
        SqliteTicketRepository::new(db.connection()).update(id, patch)
    }

    /// Permanently delete a replica.
    pub async fn delete(&self, id: &TicketId) -> Result<()> {
        let db = self.db.lock().await;
        SqliteTicketRepository::new(db.connection()).delete(id)
    }

    /// Count replicas with unpushed changes.
    pub async fn count_unsynced(&self) -> Result<usize> {
        let db = self.db.lock().await;
        SqliteTicketRepository::new(db.connection()).count_unsynced()
    }

    /// List local ids starting with a prefix.
    pub async fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let db = self.db.lock().await;
        SqliteTicketRepository::new(db.connection()).list_ids_by_prefix(prefix, limit)
    }

    /// Record a server id after a successful remote create.
    pub async fn link_server_id(
        &self,
        id: &TicketId,
        server_id: &str,
        pushed_updated_at: i64,
    ) -> Result<bool> {
        let db = self.db.lock().await;
        SqliteTicketRepository::new(db.connection()).link_server_id(
            id,
            server_id,
            pushed_updated_at,
        )
    }

    /// Mark a replica synced after a successful remote update.
    pub async fn mark_synced(&self, id: &TicketId, pushed_updated_at: i64) -> Result<bool> {
        let db = self.db.lock().await;
        SqliteTicketRepository::new(db.connection()).mark_synced(id, pushed_updated_at)
    }

    /// Run several repository calls inside one transaction.
    ///
    /// Nothing is committed if `work` returns an error.
    pub async fn transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&SqliteTicketRepository<'_>) -> Result<T>,
    {
        let db = self.db.lock().await;
        let tx = db.connection().unchecked_transaction()?;
        let value = work(&SqliteTicketRepository::new(&tx))?;
        tx.commit()?;
        Ok(value)
    }
}
