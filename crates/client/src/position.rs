// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Continuous position watch feeding the geofence state.
//!
//! One watch is active at a time. Each fix (or classified failure) is run
//! through [`GeofenceUpdate::next`] against the project's anchor and published
//! on two watch channels: the geofence state for the UI and check-in gate, and
//! the latest fix for the telemetry reporter.

use std::sync::Arc;
use std::time::Duration;

use fieldsync_core::{FixError, GeofenceState, GeofenceUpdate, Position};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::BoxFuture;
use crate::context::{ProjectContext, UiCollaborator};

/// Latest watch outcome; `None` until the first fix or after a stop.
pub type LastFix = Option<Result<Position, FixError>>;

/// Options passed to the host position source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    /// Oldest cached fix the source may return. Zero disables caching.
    pub maximum_age: Duration,
    /// Deadline for each fix.
    pub timeout: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        WatchOptions {
            high_accuracy: true,
            maximum_age: Duration::ZERO,
            timeout: Duration::from_secs(15),
        }
    }
}

/// An open subscription to the host's position stream.
///
/// `next_fix` must be cancel safe: the watcher drops it on timeout or stop.
pub trait PositionSource: Send {
    /// The next fix or failure, or `None` when the stream has ended.
    fn next_fix(&mut self) -> BoxFuture<'_, Option<Result<Position, FixError>>>;
}

/// Opens position subscriptions. Dropping the source releases it.
pub trait PositionProvider: Send + Sync {
    fn open(&self, options: &WatchOptions) -> Box<dyn PositionSource>;
}

struct ActiveWatch {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the single active position subscription.
pub struct PositionWatcher {
    provider: Arc<dyn PositionProvider>,
    project: Arc<dyn ProjectContext>,
    ui: Arc<dyn UiCollaborator>,
    options: WatchOptions,
    geofence_tx: Arc<watch::Sender<GeofenceUpdate>>,
    fix_tx: Arc<watch::Sender<LastFix>>,
    active: Option<ActiveWatch>,
}

impl PositionWatcher {
    pub fn new(
        provider: Arc<dyn PositionProvider>,
        project: Arc<dyn ProjectContext>,
        ui: Arc<dyn UiCollaborator>,
        options: WatchOptions,
    ) -> Self {
        let (geofence_tx, _) = watch::channel(GeofenceUpdate::loading());
        let (fix_tx, _) = watch::channel(None);
        PositionWatcher {
            provider,
            project,
            ui,
            options,
            geofence_tx: Arc::new(geofence_tx),
            fix_tx: Arc::new(fix_tx),
            active: None,
        }
    }

    /// Opens a new subscription, stopping the previous one first.
    pub async fn start(&mut self) {
        self.stop().await;

        publish(&self.geofence_tx, self.ui.as_ref(), GeofenceUpdate::loading());

        let source = self.provider.open(&self.options);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(watch_loop(
            source,
            self.options.timeout,
            Arc::clone(&self.project),
            Arc::clone(&self.ui),
            Arc::clone(&self.geofence_tx),
            Arc::clone(&self.fix_tx),
            cancel.clone(),
        ));
        self.active = Some(ActiveWatch { cancel, task });
        info!("position watch started");
    }

    /// Releases the subscription. Safe to call when not running.
    pub async fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        active.cancel.cancel();
        if let Err(e) = active.task.await {
            warn!("position watch task failed: {}", e);
        }
        self.fix_tx.send_replace(None);
        publish(&self.geofence_tx, self.ui.as_ref(), GeofenceUpdate::loading());
        info!("position watch stopped");
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn geofence(&self) -> GeofenceUpdate {
        *self.geofence_tx.borrow()
    }

    pub fn subscribe_geofence(&self) -> watch::Receiver<GeofenceUpdate> {
        self.geofence_tx.subscribe()
    }

    /// The latest fix, shared with the telemetry reporter.
    pub fn fixes(&self) -> watch::Receiver<LastFix> {
        self.fix_tx.subscribe()
    }
}

impl Drop for PositionWatcher {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }
}

/// Sends `update` and notifies the UI when it differs from the current value.
fn publish(tx: &watch::Sender<GeofenceUpdate>, ui: &dyn UiCollaborator, update: GeofenceUpdate) {
    let changed = tx.send_if_modified(|current| {
        if *current == update {
            false
        } else {
            *current = update;
            true
        }
    });
    if changed {
        debug!(state = %update.state, distance_m = ?update.distance_m, "geofence update");
        ui.on_geofence_state_changed(update.state, update.distance_m);
    }
}

async fn watch_loop(
    mut source: Box<dyn PositionSource>,
    fix_timeout: Duration,
    project: Arc<dyn ProjectContext>,
    ui: Arc<dyn UiCollaborator>,
    geofence_tx: Arc<watch::Sender<GeofenceUpdate>>,
    fix_tx: Arc<watch::Sender<LastFix>>,
    cancel: CancellationToken,
) {
    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            fix = tokio::time::timeout(fix_timeout, source.next_fix()) => match fix {
                Ok(Some(outcome)) => outcome,
                Ok(None) => {
                    debug!("position stream ended");
                    return;
                }
                Err(_) => Err(FixError::Timeout),
            },
        };

        if let Err(e) = &outcome {
            debug!("position fix failed: {}", e);
        }

        let anchor = project.active_geofence_anchor();
        let previous = geofence_tx.borrow().state;
        let update = GeofenceUpdate::next(previous, outcome.as_ref().map_err(|e| *e), anchor.as_ref());

        fix_tx.send_replace(Some(outcome));
        publish(&geofence_tx, ui.as_ref(), update);

        if update.state == GeofenceState::PermissionDenied {
            warn!("location permission denied; watch ends until restarted");
            return;
        }
    }
}

#[cfg(test)]
#[path = "position_tests.rs"]
mod tests;
