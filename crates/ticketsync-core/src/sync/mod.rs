//! Offline-first reconciliation between the local store and the ticket API.
//!
//! One cycle pushes every dirty replica, then pulls the full server list and
//! merges it. Only one cycle runs at a time per engine.

mod reconcile;


use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::connectivity::{ConnectivityMonitor, Transition};
use crate::db::TicketFilter;
use crate::models::{ServerTicket, Ticket};
use crate::remote::RemoteTicketService;
use crate::services::TicketStore;
use crate::state::SyncState;
use crate::{Error, Result};

pub use reconcile::{apply_pull, decide_pull, plan_push, PullAction, PullSummary, PushAction};

/// Why a call to [`SyncEngine::synchronize`] did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Offline,
    AlreadySyncing,
}

/// Counts for one finished cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub pushed_created: usize,
    pub pushed_updated: usize,
    /// Pushed, but edited again while the request was in flight
    pub edited_during_push: usize,
    pub push_failures: usize,
    pub pulled_inserted: usize,
    pub pulled_overwritten: usize,
    pub kept_local: usize,
    /// Server records skipped because they failed validation
    pub quarantined: usize,
}

impl SyncReport {
    pub const fn pushed(&self) -> usize {
        self.pushed_created + self.pushed_updated
    }

    fn absorb(&mut self, pull: PullSummary) {
        self.pulled_inserted += pull.inserted;
        self.pulled_overwritten += pull.overwritten;
        self.kept_local += pull.kept_local;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Skipped { reason: SkipReason },
    Completed(SyncReport),
}

impl SyncOutcome {
    pub const fn report(&self) -> Option<&SyncReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Skipped { .. } => None,
        }
    }

    pub const fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Skipped { reason } => Some(*reason),
            Self::Completed(_) => None,
        }
    }
}

enum PushResult {
    Created { settled: bool },
    Updated { settled: bool },
}

/// Holds the in-progress flag for the lifetime of one cycle
struct CycleGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> CycleGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct SyncEngine {
    store: TicketStore,
    remote: Arc<dyn RemoteTicketService>,
    connectivity: ConnectivityMonitor,
    in_progress: AtomicBool,
    state: watch::Sender<SyncState>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("online", &self.connectivity.is_online())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    pub fn new(
        store: TicketStore,
        remote: Arc<dyn RemoteTicketService>,
        connectivity: ConnectivityMonitor,
    ) -> Self {
        let initial = if connectivity.is_online() {
            SyncState::Idle
        } else {
            SyncState::Offline
        };
        let (state, _) = watch::channel(initial);
        Self {
            store,
            remote,
            connectivity,
            in_progress: AtomicBool::new(false),
            state,
        }
    }

    pub fn store(&self) -> &TicketStore {
        &self.store
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub fn is_syncing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Latest published sync state
    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    fn publish(&self, state: SyncState) {
        self.state.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }

    /// Run one push-then-pull cycle.
    ///
    /// Returns `Skipped` without touching anything when offline or when a
    /// cycle is already running. Individual push failures are counted in the
    /// report; a failed pull fails the whole call but keeps what was pushed.
    pub async fn synchronize(&self) -> Result<SyncOutcome> {
        if !self.connectivity.is_online() {
            tracing::debug!("Skipping sync while offline");
            self.publish(SyncState::Offline);
            return Ok(SyncOutcome::Skipped {
                reason: SkipReason::Offline,
            });
        }

        let Some(_guard) = CycleGuard::acquire(&self.in_progress) else {
            tracing::debug!("Skipping sync; a cycle is already running");
            return Ok(SyncOutcome::Skipped {
                reason: SkipReason::AlreadySyncing,
            });
        };

        self.publish(SyncState::Syncing);
        let started = std::time::Instant::now();
        let mut report = SyncReport::default();

        match self.run_cycle(&mut report).await {
            Ok(()) => {
                tracing::info!(
                    pushed = report.pushed(),
                    push_failures = report.push_failures,
                    pulled_inserted = report.pulled_inserted,
                    pulled_overwritten = report.pulled_overwritten,
                    kept_local = report.kept_local,
                    quarantined = report.quarantined,
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Sync cycle finished"
                );
                self.publish(SyncState::Synced);
                Ok(SyncOutcome::Completed(report))
            }
            Err(error) => {
                tracing::warn!(
                    %error,
                    pushed = report.pushed(),
                    push_failures = report.push_failures,
                    "Sync cycle failed"
                );
                self.publish(SyncState::Error);
                Err(error)
            }
        }
    }

    async fn run_cycle(&self, report: &mut SyncReport) -> Result<()> {
        self.push_pending(report).await?;
        self.pull_remote(report).await
    }

    async fn push_pending(&self, report: &mut SyncReport) -> Result<()> {
        let pending = self.store.list_where(&TicketFilter::Unsynced).await?;
        if !pending.is_empty() {
            tracing::debug!(count = pending.len(), "Pushing local changes");
        }

        for ticket in &pending {
            match self.push_one(ticket).await {
                Ok(PushResult::Created { settled }) => {
                    report.pushed_created += 1;
                    if !settled {
                        report.edited_during_push += 1;
                    }
                }
                Ok(PushResult::Updated { settled }) => {
                    report.pushed_updated += 1;
                    if !settled {
                        report.edited_during_push += 1;
                    }
                }
                Err(error) => {
                    report.push_failures += 1;
                    let (transient, status) = match &error {
                        Error::Remote(remote) => (remote.is_transient(), remote.status()),
                        _ => (false, None),
                    };
                    tracing::warn!(
                        ticket_id = %ticket.id,
                        server_id = ?ticket.server_id,
                        transient,
                        status = ?status,
                        %error,
                        "Failed to push ticket; it stays pending"
                    );
                }
            }
        }

        Ok(())
    }

    async fn push_one(&self, ticket: &Ticket) -> Result<PushResult> {
        match plan_push(ticket) {
            PushAction::Create(new_ticket) => {
                let created = self.remote.create(&new_ticket).await?;
                let settled = self
                    .store
                    .link_server_id(&ticket.id, &created.id, ticket.updated_at)
                    .await?;
                tracing::debug!(
                    ticket_id = %ticket.id,
                    server_id = %created.id,
                    "Created ticket on server"
                );
                Ok(PushResult::Created { settled })
            }
            PushAction::Update { server_id, patch } => {
                self.remote.update(&server_id, &patch).await?;
                let settled = self
                    .store
                    .mark_synced(&ticket.id, ticket.updated_at)
                    .await?;
                tracing::debug!(
                    ticket_id = %ticket.id,
                    server_id = %server_id,
                    "Updated ticket on server"
                );
                Ok(PushResult::Updated { settled })
            }
        }
    }

    async fn pull_remote(&self, report: &mut SyncReport) -> Result<()> {
        let payloads = self.remote.list_all().await?;

        let mut server_tickets: Vec<ServerTicket> = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let server_id = payload.id.clone();
            match ServerTicket::try_from(payload) {
                Ok(ticket) => server_tickets.push(ticket),
                Err(error) => {
                    report.quarantined += 1;
                    tracing::warn!(
                        server_id = ?server_id,
                        %error,
                        "Skipping invalid server ticket"
                    );
                }
            }
        }

        let summary = self
            .store
            .transaction(|repo| apply_pull(repo, &server_tickets))
            .await?;
        report.absorb(summary);
        Ok(())
    }

    /// Start the reconnect listener.
    ///
    /// Runs exactly one cycle per offline to online transition and publishes
    /// `Offline` when the connection drops. The task lives until aborted.
    pub fn watch_connectivity(self: Arc<Self>) -> JoinHandle<()> {
        // Baseline is read before spawning; a transition published before the
        // task is first polled must still be seen as a change.
        let mut receiver = self.connectivity.subscribe();
        let mut was_online = *receiver.borrow_and_update();
        tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let is_online = *receiver.borrow_and_update();
                match Transition::between(was_online, is_online) {
                    Some(Transition::WentOnline) => {
                        tracing::info!("Connection restored; syncing");
                        if let Err(error) = self.synchronize().await {
                            tracing::error!(%error, "Sync after reconnect failed");
                        }
                    }
                    Some(Transition::WentOffline) => self.publish(SyncState::Offline),
                    None => {}
                }
                was_online = is_online;
            }
        })
    }
}
