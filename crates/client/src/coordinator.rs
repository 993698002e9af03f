// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session-level orchestration.
//!
//! [`SyncCoordinator`] is the explicit context object for one signed-in
//! session. It owns the position watcher, the telemetry reporter, and the
//! real-time channel, and ties their lifecycles to navigation and check-in
//! events. Every start has an idempotent stop.
//!
//! Lifetimes:
//! - realtime channel: `start_session` .. `end_session`
//! - position watch: while on a geofenced screen or a check-in is active
//! - reporter: the whole session when `report_while_idle`, otherwise only
//!   during a check-in

use std::sync::Arc;

use fieldsync_core::GeofenceUpdate;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::{ResyncSource, TelemetrySink};
use crate::battery::BatterySource;
use crate::config::Config;
use crate::context::{AuthContext, Notifier, ProjectContext, UiCollaborator};
use crate::error::Result;
use crate::network::NetworkMonitor;
use crate::position::{PositionProvider, PositionWatcher, WatchOptions};
use crate::realtime::{
    ChannelSettings, ChannelStatus, ConnectionState, RealtimeChannel, ReconnectPolicy,
    SessionCacheHandle,
};
use crate::reporter::{ReporterConfig, ReporterCore, ReporterStats, TelemetryReporter};
use crate::sync::{OfflineQueue, Transport};

/// Interfaces implemented by the host application.
#[derive(Clone)]
pub struct Collaborators {
    pub auth: Arc<dyn AuthContext>,
    pub project: Arc<dyn ProjectContext>,
    pub ui: Arc<dyn UiCollaborator>,
    pub notifier: Arc<dyn Notifier>,
}

/// Device and backend adapters.
pub struct Services {
    pub positions: Arc<dyn PositionProvider>,
    pub battery: Arc<dyn BatterySource>,
    pub sink: Arc<dyn TelemetrySink>,
    pub resync: Arc<dyn ResyncSource>,
    pub transport: Box<dyn Transport>,
}

struct ConnectivityForwarder {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct SyncCoordinator {
    config: Config,
    collaborators: Collaborators,
    network: NetworkMonitor,
    watcher: PositionWatcher,
    channel: RealtimeChannel,
    reporter: Option<TelemetryReporter>,
    /// Reporter state kept while the reporter is stopped; owns the queue.
    parked: Option<ReporterCore>,
    forwarder: Option<ConnectivityForwarder>,
    session_active: bool,
    on_geofenced_screen: bool,
    checkin_active: bool,
}

impl SyncCoordinator {
    /// Wires the components. Opens the offline queue; nothing runs yet.
    pub fn new(
        config: Config,
        collaborators: Collaborators,
        services: Services,
        network: NetworkMonitor,
    ) -> Result<Self> {
        let watcher = PositionWatcher::new(
            services.positions,
            Arc::clone(&collaborators.project),
            Arc::clone(&collaborators.ui),
            WatchOptions {
                timeout: config.fix_timeout(),
                ..WatchOptions::default()
            },
        );

        let queue = OfflineQueue::open(&config.queue_path())?;
        let core = ReporterCore::new(services.sink, services.battery, queue, watcher.fixes());

        let channel = RealtimeChannel::new(
            services.transport,
            ChannelSettings {
                url: config.realtime.url.clone(),
                policy: ReconnectPolicy::from(&config.realtime),
                auth: Arc::clone(&collaborators.auth),
                resync: services.resync,
                notifier: Arc::clone(&collaborators.notifier),
                ui: Arc::clone(&collaborators.ui),
            },
        );

        Ok(SyncCoordinator {
            config,
            collaborators,
            network,
            watcher,
            channel,
            reporter: None,
            parked: Some(core),
            forwarder: None,
            session_active: false,
            on_geofenced_screen: false,
            checkin_active: false,
        })
    }

    /// Login: connect the channel and, if configured, start idle reporting.
    pub async fn start_session(&mut self) {
        if self.session_active {
            return;
        }
        self.session_active = true;
        info!("session started");

        self.start_forwarder();
        self.channel.start().await;
        if self.config.telemetry.report_while_idle {
            self.start_reporter();
        }
    }

    /// Logout: stop everything and forget cached session state.
    pub async fn end_session(&mut self) {
        if !self.session_active {
            return;
        }
        self.session_active = false;
        self.on_geofenced_screen = false;
        self.checkin_active = false;

        self.stop_reporter().await;
        self.watcher.stop().await;
        self.channel.stop().await;
        self.channel.cache().reset();
        self.stop_forwarder().await;
        info!("session ended");
    }

    /// Opens (or reopens) the position watch for the check-in screen.
    pub async fn enter_geofenced_screen(&mut self) {
        self.on_geofenced_screen = true;
        self.watcher.start().await;
    }

    /// Stops the position watch unless a check-in still needs it.
    pub async fn leave_geofenced_screen(&mut self) {
        self.on_geofenced_screen = false;
        if !self.checkin_active {
            self.watcher.stop().await;
        }
    }

    pub async fn checkin_started(&mut self) {
        if self.checkin_active {
            return;
        }
        self.checkin_active = true;
        info!("check-in started");
        match &self.reporter {
            Some(reporter) => reporter.set_checkin(true),
            None => self.start_reporter(),
        }
    }

    pub async fn checkin_ended(&mut self) {
        if !self.checkin_active {
            return;
        }
        self.checkin_active = false;
        info!("check-in ended");
        if self.config.telemetry.report_while_idle && self.session_active {
            if let Some(reporter) = &self.reporter {
                reporter.set_checkin(false);
            }
        } else {
            self.stop_reporter().await;
        }
        if !self.on_geofenced_screen {
            self.watcher.stop().await;
        }
    }

    /// Host connectivity report.
    pub fn set_online(&self, online: bool) {
        self.network.set_online(online);
    }

    /// Retries the real-time channel, e.g. after a fresh login.
    pub async fn restart_realtime(&mut self) {
        if self.session_active {
            self.channel.restart().await;
        }
    }

    pub fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    pub fn geofence(&self) -> GeofenceUpdate {
        self.watcher.geofence()
    }

    /// Only a `Valid` geofence state permits check-in.
    pub fn can_check_in(&self) -> bool {
        self.geofence().state.permits_checkin()
    }

    pub fn checkin_blocked_reason(&self) -> Option<String> {
        let radius = self
            .collaborators
            .project
            .active_geofence_anchor()
            .map(|a| a.radius_meters)
            .unwrap_or(self.config.geofence.default_radius_m);
        self.geofence().blocked_reason(radius)
    }

    pub fn realtime_state(&self) -> ConnectionState {
        self.channel.state()
    }

    pub fn realtime_status(&self) -> ChannelStatus {
        self.channel.status()
    }

    pub fn session_cache(&self) -> &SessionCacheHandle {
        self.channel.cache()
    }

    pub fn reporter_stats(&self) -> Option<ReporterStats> {
        self.reporter.as_ref().map(|r| r.stats())
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_running()
    }

    pub fn is_reporting(&self) -> bool {
        self.reporter.is_some()
    }

    fn start_reporter(&mut self) {
        if self.reporter.is_some() {
            return;
        }
        let Some(mut core) = self.parked.take() else {
            warn!("telemetry reporter unavailable");
            return;
        };
        core.set_checkin(self.checkin_active);
        self.reporter = Some(TelemetryReporter::spawn(
            core,
            ReporterConfig::from(&self.config.telemetry),
            &self.network,
        ));
    }

    async fn stop_reporter(&mut self) {
        let Some(mut reporter) = self.reporter.take() else {
            return;
        };
        if let Some(core) = reporter.stop().await {
            self.parked = Some(core);
        }
    }

    fn start_forwarder(&mut self) {
        if self.forwarder.is_some() {
            return;
        }
        let ui = Arc::clone(&self.collaborators.ui);
        let mut network = self.network.subscribe();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = network.changed() => match changed {
                        Some(online) => ui.on_connectivity_changed(online),
                        None => break,
                    },
                }
            }
        });
        self.forwarder = Some(ConnectivityForwarder { cancel, task });
    }

    async fn stop_forwarder(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.cancel.cancel();
            let _ = forwarder.task.await;
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
