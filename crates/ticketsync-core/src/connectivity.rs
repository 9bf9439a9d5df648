//! Connectivity monitor.
//!
//! Holds the current online/offline flag and broadcasts transitions over a
//! `tokio::sync::watch` channel. Whatever knows about the network (an OS
//! callback, a health probe, a test) calls [`ConnectivityMonitor::set_online`].

use std::sync::Arc;

use tokio::sync::watch;

/// A change in connectivity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    WentOnline,
    WentOffline,
}

impl Transition {
    /// Transition implied by two consecutive observations, if any
    pub const fn between(was_online: bool, is_online: bool) -> Option<Self> {
        match (was_online, is_online) {
            (false, true) => Some(Self::WentOnline),
            (true, false) => Some(Self::WentOffline),
            _ => None,
        }
    }
}

/// Cloneable handle to the shared connectivity flag
#[derive(Clone, Debug)]
pub struct ConnectivityMonitor {
    sender: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (sender, _) = watch::channel(initially_online);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Synchronous "am I online" query
    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    /// Publish the latest observation. Returns the transition it caused.
    ///
    /// Repeating the current value notifies nobody.
    pub fn set_online(&self, online: bool) -> Option<Transition> {
        let mut previous = online;
        self.sender.send_if_modified(|current| {
            previous = *current;
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        let transition = Transition::between(previous, online);
        if let Some(transition) = transition {
            tracing::info!(?transition, "Connectivity changed");
        }
        transition
    }

    /// Receiver for connectivity changes; the current value counts as seen
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
