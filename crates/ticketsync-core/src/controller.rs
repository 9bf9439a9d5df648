//! Ticket controller: the surface presentation layers talk to.
//!
//! Every write lands in the local store first and is visible immediately.
//! Synchronization is opportunistic and never blocks a write.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::{JoinHandle, JoinSet};

use crate::connectivity::ConnectivityMonitor;
use crate::models::{NewTicket, Ticket, TicketId, TicketPatch, TicketStatus};
use crate::services::TicketStore;
use crate::state::SyncState;
use crate::sync::{SyncEngine, SyncOutcome};
use crate::Result;

/// Tickets of one status, in board order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardColumn {
    pub status: TicketStatus,
    pub tickets: Vec<Ticket>,
}

/// Handles for the tasks started by [`TicketController::spawn_background`].
///
/// Dropping it stops them.
#[derive(Debug)]
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn abort(&self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

impl Drop for BackgroundTasks {
    fn drop(&mut self) {
        self.abort();
    }
}

#[derive(Clone)]
pub struct TicketController {
    store: TicketStore,
    engine: Arc<SyncEngine>,
    connectivity: ConnectivityMonitor,
    snapshot: Arc<RwLock<Vec<Ticket>>>,
    pending_syncs: Arc<Mutex<JoinSet<()>>>,
}

impl TicketController {
    pub fn new(
        store: TicketStore,
        engine: Arc<SyncEngine>,
        connectivity: ConnectivityMonitor,
    ) -> Self {
        Self {
            store,
            engine,
            connectivity,
            snapshot: Arc::new(RwLock::new(Vec::new())),
            pending_syncs: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    pub fn store(&self) -> &TicketStore {
        &self.store
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn is_syncing(&self) -> bool {
        self.engine.is_syncing()
    }

    pub fn sync_state(&self) -> SyncState {
        self.engine.state()
    }

    /// Reload the in-memory snapshot from the store
    pub async fn refresh(&self) -> Result<()> {
        reload_snapshot(&self.store, &self.snapshot).await
    }

    pub async fn create(&self, data: NewTicket) -> Result<Ticket> {
        let ticket = self.store.create(&data).await?;
        tracing::debug!(ticket_id = %ticket.id, "Created ticket locally");
        self.refresh().await?;
        self.sync_in_background().await;
        Ok(ticket)
    }

    pub async fn update(&self, id: &TicketId, patch: TicketPatch) -> Result<Ticket> {
        let ticket = self.store.update(id, &patch).await?;
        tracing::debug!(ticket_id = %ticket.id, "Updated ticket locally");
        self.refresh().await?;
        self.sync_in_background().await;
        Ok(ticket)
    }

    /// Remove the local replica. The server is not told.
    pub async fn delete(&self, id: &TicketId) -> Result<()> {
        self.store.delete(id).await?;
        tracing::debug!(ticket_id = %id, "Deleted ticket locally");
        self.refresh().await
    }

    /// Snapshot as of the last refresh
    pub async fn list(&self) -> Vec<Ticket> {
        self.snapshot.read().await.clone()
    }

    pub async fn list_by_status(&self, status: TicketStatus) -> Vec<Ticket> {
        self.snapshot
            .read()
            .await
            .iter()
            .filter(|ticket| ticket.status == status)
            .cloned()
            .collect()
    }

    pub async fn unsynced_count(&self) -> usize {
        self.snapshot
            .read()
            .await
            .iter()
            .filter(|ticket| ticket.is_dirty())
            .count()
    }

    /// Snapshot grouped into kanban columns, newest first within a column
    pub async fn board(&self) -> Vec<BoardColumn> {
        let snapshot = self.snapshot.read().await;
        TicketStatus::ALL
            .iter()
            .map(|&status| {
                let mut tickets = snapshot
                    .iter()
                    .filter(|ticket| ticket.status == status)
                    .cloned()
                    .collect::<Vec<_>>();
                tickets.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
                BoardColumn { status, tickets }
            })
            .collect()
    }

    /// Manual refresh: run one cycle now and reload the snapshot.
    ///
    /// The snapshot is reloaded even when the cycle fails, since pushes made
    /// before a failed pull are kept.
    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        let outcome = self.engine.synchronize().await;
        self.refresh().await?;
        outcome
    }

    /// Wait for opportunistic syncs started by earlier writes
    pub async fn settle(&self) {
        let mut pending = self.pending_syncs.lock().await;
        while let Some(joined) = pending.join_next().await {
            if let Err(error) = joined {
                tracing::warn!(%error, "Background sync task did not finish");
            }
        }
    }

    /// Start the reconnect listener and a task that reloads the snapshot
    /// after every finished cycle.
    pub fn spawn_background(&self) -> BackgroundTasks {
        let listener = Arc::clone(&self.engine).watch_connectivity();

        let mut states = self.engine.subscribe_state();
        let store = self.store.clone();
        let snapshot = Arc::clone(&self.snapshot);
        let refresher = tokio::spawn(async move {
            while states.changed().await.is_ok() {
                let state = *states.borrow_and_update();
                if !state.is_cycle_end() {
                    continue;
                }
                if let Err(error) = reload_snapshot(&store, &snapshot).await {
                    tracing::warn!(%error, "Failed to reload tickets after sync");
                }
            }
        });

        BackgroundTasks {
            handles: vec![listener, refresher],
        }
    }

    async fn sync_in_background(&self) {
        if !self.connectivity.is_online() {
            return;
        }

        let engine = Arc::clone(&self.engine);
        let store = self.store.clone();
        let snapshot = Arc::clone(&self.snapshot);
        let mut pending = self.pending_syncs.lock().await;
        reap_finished(&mut pending);
        pending.spawn(async move {
            match engine.synchronize().await {
                Ok(outcome) => {
                    tracing::debug!(?outcome, "Opportunistic sync finished");
                }
                Err(error) => {
                    tracing::warn!(%error, "Opportunistic sync failed");
                }
            }
            if let Err(error) = reload_snapshot(&store, &snapshot).await {
                tracing::warn!(%error, "Failed to reload tickets after sync");
            }
        });
    }
}

/// Drop tasks that already finished so the set does not grow with every write
fn reap_finished(pending: &mut JoinSet<()>) {
    while let Some(joined) = pending.try_join_next() {
        if let Err(error) = joined {
            tracing::warn!(%error, "Background sync task did not finish");
        }
    }
}

async fn reload_snapshot(store: &TicketStore, snapshot: &RwLock<Vec<Ticket>>) -> Result<()> {
    let tickets = store.list().await?;
    *snapshot.write().await = tickets;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering::SeqCst;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::remote::fake::FakeRemote;
    use crate::remote::RemoteTicketService;
    use crate::sync::SkipReason;

    fn controller(online: bool) -> (TicketController, Arc<FakeRemote>, ConnectivityMonitor) {
        let store = TicketStore::open_in_memory().unwrap();
        let remote = Arc::new(FakeRemote::new());
        let connectivity = ConnectivityMonitor::new(online);
        let engine = Arc::new(SyncEngine::new(
            store.clone(),
            remote.clone() as Arc<dyn RemoteTicketService>,
            connectivity.clone(),
        ));
        (
            TicketController::new(store, engine, connectivity.clone()),
            remote,
            connectivity,
        )
    }

    fn new_ticket(title: &str, status: TicketStatus) -> NewTicket {
        NewTicket::new(title, "details", status)
    }

    #[tokio::test]
    async fn writes_are_visible_and_dirty_immediately() {
        let (controller, remote, _) = controller(false);

        let created = controller
            .create(new_ticket("Offline", TicketStatus::Todo))
            .await
            .unwrap();
        assert!(!created.is_synced);
        assert_eq!(controller.list().await.len(), 1);
        assert_eq!(controller.unsynced_count().await, 1);

        // Same values still count as a local edit.
        let updated = controller
            .update(&created.id, TicketPatch::default().title("Offline"))
            .await
            .unwrap();
        assert!(!updated.is_synced);
        assert!(updated.updated_at >= created.updated_at);

        controller.settle().await;
        assert_eq!(remote.create_calls.load(SeqCst), 0);
    }

    #[tokio::test]
    async fn online_write_syncs_in_background() {
        let (controller, remote, _) = controller(true);

        let created = controller
            .create(new_ticket("Ship it", TicketStatus::InProgress))
            .await
            .unwrap();
        assert!(!created.is_synced);

        controller.settle().await;

        assert_eq!(remote.tickets().len(), 1);
        assert_eq!(controller.unsynced_count().await, 0);
        let listed = controller.list().await;
        assert!(listed[0].server_id.is_some());
    }

    #[tokio::test]
    async fn finished_background_syncs_are_reaped_on_the_next_write() {
        let (controller, remote, _) = controller(true);

        for title in ["One", "Two", "Three"] {
            controller
                .create(new_ticket(title, TicketStatus::Todo))
                .await
                .unwrap();
            // Let the spawned sync run to completion before the next write.
            tokio::time::timeout(Duration::from_secs(5), async {
                while remote.tickets().len() < controller.list().await.len()
                    || controller.is_syncing()
                {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await
            .unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(controller.pending_syncs.lock().await.len(), 1);
        controller.settle().await;
        assert!(controller.pending_syncs.lock().await.is_empty());
        assert_eq!(remote.tickets().len(), 3);
    }

    #[tokio::test]
    async fn delete_is_local_only() {
        let (controller, remote, _) = controller(true);
        let created = controller
            .create(new_ticket("Temporary", TicketStatus::Todo))
            .await
            .unwrap();
        controller.settle().await;
        let calls_before = remote.create_calls.load(SeqCst) + remote.update_calls.load(SeqCst);

        controller.delete(&created.id).await.unwrap();

        assert!(controller.list().await.is_empty());
        assert_eq!(remote.tickets().len(), 1);
        assert_eq!(
            remote.create_calls.load(SeqCst) + remote.update_calls.load(SeqCst),
            calls_before
        );
    }

    #[tokio::test]
    async fn list_by_status_and_board_use_the_snapshot() {
        let (controller, _, _) = controller(false);
        controller
            .create(new_ticket("Write docs", TicketStatus::Todo))
            .await
            .unwrap();
        controller
            .create(new_ticket("Fix login", TicketStatus::InProgress))
            .await
            .unwrap();
        controller
            .create(new_ticket("Release", TicketStatus::Done))
            .await
            .unwrap();
        controller
            .create(new_ticket("Triage", TicketStatus::Todo))
            .await
            .unwrap();

        let todo = controller.list_by_status(TicketStatus::Todo).await;
        assert_eq!(todo.len(), 2);

        let board = controller.board().await;
        let columns = board
            .iter()
            .map(|column| (column.status, column.tickets.len()))
            .collect::<Vec<_>>();
        assert_eq!(
            columns,
            vec![
                (TicketStatus::Todo, 2),
                (TicketStatus::InProgress, 1),
                (TicketStatus::Done, 1),
            ]
        );
    }

    #[tokio::test]
    async fn sync_now_reports_skip_when_offline() {
        let (controller, _, _) = controller(false);
        controller
            .create(new_ticket("Later", TicketStatus::Todo))
            .await
            .unwrap();

        let outcome = controller.sync_now().await.unwrap();

        assert_eq!(outcome.skip_reason(), Some(SkipReason::Offline));
        assert_eq!(controller.unsynced_count().await, 1);
        assert_eq!(controller.sync_state(), SyncState::Offline);
    }

    #[tokio::test]
    async fn sync_now_refreshes_even_when_pull_fails() {
        let (controller, remote, _) = controller(false);
        controller
            .create(new_ticket("Pushed", TicketStatus::Todo))
            .await
            .unwrap();
        controller.connectivity.set_online(true);
        remote.fail_list(true);

        assert!(controller.sync_now().await.is_err());

        assert_eq!(controller.unsynced_count().await, 0);
        assert_eq!(controller.sync_state(), SyncState::Error);
    }

    #[tokio::test]
    async fn background_tasks_sync_and_refresh_on_reconnect() {
        let (controller, remote, connectivity) = controller(false);
        controller
            .create(new_ticket("Queued", TicketStatus::Todo))
            .await
            .unwrap();
        let tasks = controller.spawn_background();

        connectivity.set_online(true);

        let refreshed = tokio::time::timeout(Duration::from_secs(5), async {
            while controller.unsynced_count().await != 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(refreshed.is_ok(), "snapshot was not refreshed after reconnect");
        assert_eq!(remote.tickets().len(), 1);

        tasks.abort();
    }
}
