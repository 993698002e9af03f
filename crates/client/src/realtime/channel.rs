// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The persistent real-time connection.
//!
//! One task owns the transport. It connects with the current token, joins
//! the user's room, pumps events into the [`EventRouter`], and on any drop
//! runs the reconnect schedule. Every successful connection after the first
//! triggers a resync so events missed while disconnected are recovered. The
//! resync runs on its own task while events keep flowing.

use std::sync::Arc;
use std::time::Duration;

use fieldsync_core::{ClientFrame, DisconnectReason, ServerFrame};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::policy::ReconnectPolicy;
use super::router::{EventRouter, SessionCacheHandle};
use super::state::{ChannelStatus, ConnectionState};
use crate::api::ResyncSource;
use crate::context::{AuthContext, Notifier, UiCollaborator};
use crate::sync::{Inbound, Transport, TransportError};

/// Everything the channel task needs besides the transport.
#[derive(Clone)]
pub struct ChannelSettings {
    pub url: String,
    pub policy: ReconnectPolicy,
    pub auth: Arc<dyn AuthContext>,
    pub resync: Arc<dyn ResyncSource>,
    pub notifier: Arc<dyn Notifier>,
    pub ui: Arc<dyn UiCollaborator>,
}

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<Box<dyn Transport>>,
}

/// Handle to the real-time channel.
///
/// `start` is a no-op while a connection cycle is live; after the channel
/// reaches `Failed` (or was stopped) it starts a fresh cycle.
pub struct RealtimeChannel {
    settings: ChannelSettings,
    cache: SessionCacheHandle,
    status_tx: Arc<watch::Sender<ChannelStatus>>,
    transport: Option<Box<dyn Transport>>,
    running: Option<Running>,
}

impl RealtimeChannel {
    pub fn new(transport: Box<dyn Transport>, settings: ChannelSettings) -> Self {
        let (status_tx, _) = watch::channel(ChannelStatus::default());
        RealtimeChannel {
            settings,
            cache: SessionCacheHandle::new(),
            status_tx: Arc::new(status_tx),
            transport: Some(transport),
            running: None,
        }
    }

    pub fn status(&self) -> ChannelStatus {
        *self.status_tx.borrow()
    }

    pub fn state(&self) -> ConnectionState {
        self.status().state
    }

    pub fn subscribe(&self) -> watch::Receiver<ChannelStatus> {
        self.status_tx.subscribe()
    }

    pub fn cache(&self) -> &SessionCacheHandle {
        &self.cache
    }

    /// Whether a connection cycle is live.
    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|r| !r.task.is_finished())
    }

    /// Starts a connection cycle unless one is live.
    ///
    /// Without a token nothing is attempted and the state stays `Disconnected`.
    pub async fn start(&mut self) {
        if self.is_running() {
            debug!("realtime channel already running");
            return;
        }
        self.reclaim().await;

        if self.settings.auth.current_token().is_none() {
            info!("no auth token; realtime channel not started");
            return;
        }
        let Some(transport) = self.transport.take() else {
            warn!("realtime transport unavailable");
            return;
        };

        let cancel = CancellationToken::new();
        let task = ChannelTask {
            transport,
            settings: self.settings.clone(),
            router: EventRouter::new(
                self.cache.clone(),
                Arc::clone(&self.settings.auth),
                Arc::clone(&self.settings.notifier),
            ),
            status_tx: Arc::clone(&self.status_tx),
            resync_task: None,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(task.run());
        self.running = Some(Running { cancel, task });
    }

    /// Closes the connection and cancels any pending retry. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
        self.reclaim().await;
    }

    /// Stops, then starts a fresh cycle with the current token.
    pub async fn restart(&mut self) {
        self.stop().await;
        self.start().await;
    }

    async fn reclaim(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        match running.task.await {
            Ok(transport) => self.transport = Some(transport),
            Err(e) => warn!("realtime task failed: {}", e),
        }
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
    }
}

struct ChannelTask {
    transport: Box<dyn Transport>,
    settings: ChannelSettings,
    router: EventRouter,
    status_tx: Arc<watch::Sender<ChannelStatus>>,
    cancel: CancellationToken,
    /// The latest resync; runs beside the event pump.
    resync_task: Option<JoinHandle<()>>,
}

/// How a connect cycle ended.
enum Cycle {
    Connected,
    /// Cancelled, out of budget, or out of token. State already published.
    Ended,
}

impl ChannelTask {
    async fn run(mut self) -> Box<dyn Transport> {
        let mut cycle = self.connect(ConnectionState::Connecting, Duration::ZERO).await;

        while let Cycle::Connected = cycle {
            let reason = match self.session().await {
                Some(reason) => reason,
                None => break,
            };
            info!("realtime disconnected: {}", reason);

            let first_delay = match reason {
                // The server will not reconnect us; schedule one manual attempt.
                DisconnectReason::ServerInitiated => self.settings.policy.server_disconnect_delay,
                _ => self.settings.policy.delay(1),
            };
            cycle = self.connect(ConnectionState::Reconnecting, first_delay).await;
        }

        if let Some(resync) = self.resync_task.take() {
            resync.abort();
        }
        if self.cancel.is_cancelled() {
            let _ = self.transport.disconnect().await;
            self.set_state(ConnectionState::Disconnected);
        }
        self.transport
    }

    fn set_state(&self, state: ConnectionState) {
        let mut changed = false;
        self.status_tx.send_modify(|status| {
            if status.state != state {
                if !status.state.can_transition_to(state) {
                    warn!(from = %status.state, to = %state, "unexpected realtime transition");
                }
                status.state = state;
                changed = true;
            }
            if state == ConnectionState::Connected {
                status.attempt = 0;
            }
        });
        if changed {
            debug!(%state, "realtime state");
            self.settings.ui.on_realtime_state_changed(state);
        }
    }

    /// Sleeps unless cancelled. Returns false when cancelled.
    async fn pause(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            return !self.cancel.is_cancelled();
        }
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Runs one connect cycle within the attempt budget.
    async fn connect(&mut self, state: ConnectionState, first_delay: Duration) -> Cycle {
        self.set_state(state);
        let policy = self.settings.policy;
        let mut attempt = 0u32;
        let mut delay = first_delay;

        loop {
            if !self.pause(delay).await {
                return Cycle::Ended;
            }
            let Some(token) = self.settings.auth.current_token() else {
                info!("auth token gone; not reconnecting");
                self.set_state(ConnectionState::Disconnected);
                return Cycle::Ended;
            };

            attempt = attempt.saturating_add(1);
            self.status_tx.send_modify(|s| s.attempt = attempt);

            let result = tokio::select! {
                _ = self.cancel.cancelled() => return Cycle::Ended,
                result = self.transport.connect(&self.settings.url, &token) => result,
            };

            match result {
                Ok(()) => {
                    if self.on_connected().await {
                        return Cycle::Connected;
                    }
                    if self.cancel.is_cancelled() {
                        return Cycle::Ended;
                    }
                }
                Err(e) => warn!(attempt, "realtime connect failed: {}", e),
            }

            if policy.exhausted(attempt) {
                warn!(attempts = attempt, "realtime reconnect budget exhausted");
                self.set_state(ConnectionState::Failed);
                return Cycle::Ended;
            }
            delay = policy.delay(attempt);
        }
    }

    /// Joins the user room and starts a resync after reconnects.
    ///
    /// False if the join failed or was cancelled.
    async fn on_connected(&mut self) -> bool {
        if let Some(user_id) = self.settings.auth.current_user_id() {
            let joined = tokio::select! {
                _ = self.cancel.cancelled() => return false,
                joined = self.transport.send(ClientFrame::join_user(user_id)) => joined,
            };
            if let Err(e) = joined {
                warn!("join failed: {}", e);
                let _ = self.transport.disconnect().await;
                return false;
            }
        }

        let reconnect = self.status_tx.borrow().connects > 0;
        self.status_tx.send_modify(|s| s.connects += 1);
        self.set_state(ConnectionState::Connected);
        info!(reconnect, "realtime connected");

        if reconnect {
            self.resync();
        }
        true
    }

    /// Refetches server-pushed collections on a task of its own, replacing
    /// any resync still pending. Failures leave the cache as is.
    fn resync(&mut self) {
        self.status_tx.send_modify(|s| s.resyncs += 1);
        if let Some(stale) = self.resync_task.take() {
            stale.abort();
        }
        let source = Arc::clone(&self.settings.resync);
        let router = self.router.clone();
        self.resync_task = Some(tokio::spawn(async move {
            match source.fetch_campaigns().await {
                Ok(list) => {
                    let fresh = router.cache().replace_campaigns(list);
                    debug!(unseen = fresh.len(), "campaigns resynced");
                    router.announce_unseen(&fresh);
                }
                Err(e) => warn!("resync failed: {}", e),
            }
        }));
    }

    /// Pumps events until the connection drops. `None` when cancelled.
    async fn session(&mut self) -> Option<DisconnectReason> {
        loop {
            let inbound = tokio::select! {
                _ = self.cancel.cancelled() => return None,
                inbound = self.transport.recv() => inbound,
            };
            match inbound {
                Ok(Inbound::Frame(ServerFrame::Event { event, data })) => {
                    self.router.handle(&event, &data);
                }
                Ok(Inbound::Frame(ServerFrame::Disconnect { reason })) => {
                    debug!(?reason, "server closed the channel");
                    let _ = self.transport.disconnect().await;
                    return Some(DisconnectReason::ServerInitiated);
                }
                Ok(Inbound::Closed(reason)) => return Some(reason),
                Err(TransportError::SerializationError(e)) => {
                    warn!("unreadable realtime frame skipped: {}", e);
                }
                Err(e) => {
                    debug!("realtime receive failed: {}", e);
                    let _ = self.transport.disconnect().await;
                    return Some(DisconnectReason::TransportError);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
