// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity tracking.
//!
//! The host reports reachability through [`NetworkMonitor::set_online`];
//! consumers either read the current value or subscribe to transitions.

use std::sync::Arc;

use tokio::sync::watch;

/// Shared connectivity flag. Cloning yields another handle to the same state.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    tx: Arc<watch::Sender<bool>>,
}

impl NetworkMonitor {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        NetworkMonitor { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Records the current connectivity. Returns true if it changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!(online, "network transition");
        }
        changed
    }

    /// Subscribes to transitions from the current value onward.
    pub fn subscribe(&self) -> NetworkSubscription {
        let mut rx = self.tx.subscribe();
        rx.mark_unchanged();
        NetworkSubscription { rx }
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

/// A stream of connectivity transitions.
#[derive(Debug)]
pub struct NetworkSubscription {
    rx: watch::Receiver<bool>,
}

impl NetworkSubscription {
    /// Waits for the next transition and returns the new value.
    ///
    /// Returns `None` once every monitor handle is dropped.
    pub async fn changed(&mut self) -> Option<bool> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    pub fn current(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
