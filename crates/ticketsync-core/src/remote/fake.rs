//! In-memory ticket API used by engine and controller tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use super::{RemoteError, RemoteResult, RemoteTicketService};
use crate::models::{NewTicket, ServerTicket, ServerTicketPayload, TicketPatch, TicketStatus};

#[derive(Default)]
pub struct FakeRemote {
    tickets: Mutex<Vec<ServerTicket>>,
    raw_extras: Mutex<Vec<ServerTicketPayload>>,
    failing_titles: Mutex<HashSet<String>>,
    next_id: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    fail_list: AtomicBool,
    block_list: AtomicBool,
    /// Signalled when a blocked `list_all` call has started
    pub list_entered: Notify,
    /// Signal to let a blocked `list_all` call finish
    pub list_release: Notify,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tickets(&self) -> Vec<ServerTicket> {
        self.tickets.lock().unwrap().clone()
    }

    /// Seed a ticket as if another client had created it
    pub fn insert(&self, title: &str, status: TicketStatus, updated_at: DateTime<Utc>) -> String {
        let id = self.allocate_id();
        self.tickets.lock().unwrap().push(ServerTicket {
            id: id.clone(),
            title: title.to_string(),
            description: format!("{title} description"),
            status,
            created_at: updated_at,
            updated_at,
        });
        id
    }

    /// Simulate an edit made on the server by someone else
    pub fn edit(&self, id: &str, title: &str, updated_at: DateTime<Utc>) {
        let mut tickets = self.tickets.lock().unwrap();
        let ticket = tickets.iter_mut().find(|ticket| ticket.id == id).unwrap();
        ticket.title = title.to_string();
        ticket.updated_at = updated_at;
    }

    /// Add a record that only exists on the wire (e.g. an unknown status)
    pub fn insert_raw(&self, payload: ServerTicketPayload) {
        self.raw_extras.lock().unwrap().push(payload);
    }

    /// Make every create/update carrying this title fail
    pub fn fail_title(&self, title: &str) {
        self.failing_titles
            .lock()
            .unwrap()
            .insert(title.to_string());
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Park the next `list_all` until `list_release` is notified
    pub fn block_next_list(&self) {
        self.block_list.store(true, Ordering::SeqCst);
    }

    fn allocate_id(&self) -> String {
        format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn check_title(&self, title: &str) -> RemoteResult<()> {
        if self.failing_titles.lock().unwrap().contains(title) {
            return Err(RemoteError::Api {
                status: 503,
                message: format!("simulated failure for '{title}'"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteTicketService for FakeRemote {
    async fn list_all(&self) -> RemoteResult<Vec<ServerTicketPayload>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.block_list.swap(false, Ordering::SeqCst) {
            self.list_entered.notify_one();
            self.list_release.notified().await;
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(RemoteError::Api {
                status: 502,
                message: "simulated list failure".to_string(),
            });
        }

        let mut payloads = self
            .tickets
            .lock()
            .unwrap()
            .iter()
            .map(ServerTicketPayload::from)
            .collect::<Vec<_>>();
        payloads.extend(self.raw_extras.lock().unwrap().iter().cloned());
        Ok(payloads)
    }

    async fn get(&self, id: &str) -> RemoteResult<ServerTicket> {
        self.tickets
            .lock()
            .unwrap()
            .iter()
            .find(|ticket| ticket.id == id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    async fn create(&self, ticket: &NewTicket) -> RemoteResult<ServerTicket> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_title(&ticket.title)?;

        let now = Utc::now();
        let created = ServerTicket {
            id: self.allocate_id(),
            title: ticket.title.clone(),
            description: ticket.description.clone(),
            status: ticket.status,
            created_at: now,
            updated_at: now,
        };
        self.tickets.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: &TicketPatch) -> RemoteResult<ServerTicket> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(title) = patch.title.as_deref() {
            self.check_title(title)?;
        }

        let mut tickets = self.tickets.lock().unwrap();
        let ticket = tickets
            .iter_mut()
            .find(|ticket| ticket.id == id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        if let Some(title) = &patch.title {
            ticket.title.clone_from(title);
        }
        if let Some(description) = &patch.description {
            ticket.description.clone_from(description);
        }
        if let Some(status) = patch.status {
            ticket.status = status;
        }
        ticket.updated_at = Utc::now();
        Ok(ticket.clone())
    }

    async fn delete(&self, id: &str) -> RemoteResult<()> {
        let mut tickets = self.tickets.lock().unwrap();
        let before = tickets.len();
        tickets.retain(|ticket| ticket.id != id);
        if tickets.len() == before {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
