// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Adaptive-interval telemetry reporting.
//!
//! [`ReporterCore`] owns the offline queue and does the work of one tick or
//! one flush. [`TelemetryReporter`] runs a core on a spawned task that:
//! - ticks on the interval for the current check-in state
//! - reschedules and sends immediately when the check-in state flips
//! - flushes the queue and sends immediately when the network comes back

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fieldsync_core::{TelemetryErrorReason, TelemetryRecord};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::TelemetrySink;
use crate::battery::BatterySource;
use crate::config::TelemetryConfig;
use crate::network::{NetworkMonitor, NetworkSubscription};
use crate::position::LastFix;
use crate::sync::{OfflineQueue, QueueResult};

/// Reporting cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReporterConfig {
    pub active_interval: Duration,
    pub inactive_interval: Duration,
}

impl ReporterConfig {
    pub fn interval_for(&self, checkin_active: bool) -> Duration {
        if checkin_active {
            self.active_interval
        } else {
            self.inactive_interval
        }
    }
}

impl From<&TelemetryConfig> for ReporterConfig {
    fn from(config: &TelemetryConfig) -> Self {
        ReporterConfig {
            active_interval: Duration::from_millis(config.active_interval_ms),
            inactive_interval: Duration::from_millis(config.inactive_interval_ms),
        }
    }
}

/// What happened to a freshly built record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Delivered,
    Queued,
    /// The backend rejected it permanently.
    Dropped,
}

/// Result of replaying the offline queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub delivered: usize,
    pub dropped: usize,
    /// Records left queued after a transient failure.
    pub requeued: usize,
}

/// Counters published after every tick and flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReporterStats {
    pub ticks: u64,
    pub delivered: u64,
    pub queued: u64,
    pub dropped: u64,
    pub replayed: u64,
    /// Records waiting in the offline queue.
    pub pending: usize,
    pub interval: Duration,
}

/// Builds, sends, and queues telemetry records.
pub struct ReporterCore {
    sink: Arc<dyn TelemetrySink>,
    battery: Arc<dyn BatterySource>,
    queue: OfflineQueue,
    fixes: watch::Receiver<LastFix>,
    online: bool,
    checkin_active: bool,
}

impl ReporterCore {
    pub fn new(
        sink: Arc<dyn TelemetrySink>,
        battery: Arc<dyn BatterySource>,
        queue: OfflineQueue,
        fixes: watch::Receiver<LastFix>,
    ) -> Self {
        ReporterCore {
            sink,
            battery,
            queue,
            fixes,
            online: true,
            checkin_active: false,
        }
    }

    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    pub fn set_checkin(&mut self, active: bool) {
        self.checkin_active = active;
    }

    pub fn checkin_active(&self) -> bool {
        self.checkin_active
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    pub fn sink(&self) -> Arc<dyn TelemetrySink> {
        Arc::clone(&self.sink)
    }

    /// Snapshot of the current fix, battery, and connectivity.
    pub fn build_record(&self) -> TelemetryRecord {
        let fix = *self.fixes.borrow();
        let record = TelemetryRecord::new(
            None,
            self.battery.status(),
            self.online,
            self.checkin_active,
            Utc::now(),
        );
        match fix {
            Some(Ok(position)) => TelemetryRecord {
                position: Some(position),
                ..record
            },
            Some(Err(e)) => record.with_error(TelemetryErrorReason::from(e)),
            None => record,
        }
    }

    /// Builds one record and delivers or queues it. Never retries inline.
    pub async fn report_once(&mut self) -> QueueResult<ReportOutcome> {
        let record = self.build_record();
        self.report(record).await
    }

    async fn report(&mut self, record: TelemetryRecord) -> QueueResult<ReportOutcome> {
        if !self.online {
            self.queue.enqueue(&record)?;
            debug!("offline; telemetry queued");
            return Ok(ReportOutcome::Queued);
        }

        match self.sink.deliver(&record.to_payload(false)).await {
            Ok(()) => Ok(ReportOutcome::Delivered),
            Err(e) if e.is_retryable() => {
                debug!("telemetry send failed, queued: {}", e);
                self.queue.enqueue(&record)?;
                Ok(ReportOutcome::Queued)
            }
            Err(e) => {
                warn!("telemetry rejected, dropped: {}", e);
                Ok(ReportOutcome::Dropped)
            }
        }
    }

    /// Replays the queue in order, marking each record as queued.
    ///
    /// Permanently rejected records are dropped. The first transient failure
    /// stops the flush and leaves that record and the rest at the front.
    /// Each record leaves the queue only once it has been handled, so a flush
    /// abandoned mid-request loses nothing.
    pub async fn flush(&mut self) -> QueueResult<FlushSummary> {
        let mut summary = FlushSummary::default();
        if !self.online {
            return Ok(summary);
        }

        let records = self.queue.peek_all()?;
        for (i, record) in records.iter().enumerate() {
            match self.sink.deliver(&record.to_payload(true)).await {
                Ok(()) => summary.delivered += 1,
                Err(e) if e.is_retryable() => {
                    summary.requeued = records.len() - i;
                    debug!("flush stopped, {} records kept: {}", summary.requeued, e);
                    break;
                }
                Err(e) => {
                    warn!("queued telemetry rejected, dropped: {}", e);
                    summary.dropped += 1;
                }
            }
            self.queue.remove_first(1)?;
        }

        if !records.is_empty() {
            info!(
                delivered = summary.delivered,
                dropped = summary.dropped,
                requeued = summary.requeued,
                "offline queue flushed"
            );
        }
        Ok(summary)
    }
}

enum Command {
    SetCheckin(bool),
    ReportNow,
    Flush,
}

/// Handle to a running reporter task.
pub struct TelemetryReporter {
    commands: mpsc::UnboundedSender<Command>,
    stats: watch::Receiver<ReporterStats>,
    cancel: CancellationToken,
    task: Option<JoinHandle<ReporterCore>>,
}

impl TelemetryReporter {
    /// Starts reporting. The first record is sent immediately.
    pub fn spawn(mut core: ReporterCore, config: ReporterConfig, network: &NetworkMonitor) -> Self {
        core.set_online(network.is_online());
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (stats_tx, stats) = watch::channel(ReporterStats {
            pending: core.queue.len().unwrap_or(0),
            interval: config.interval_for(core.checkin_active),
            ..ReporterStats::default()
        });
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            core,
            config,
            command_rx,
            network.subscribe(),
            stats_tx,
            cancel.clone(),
        ));
        info!("telemetry reporter started");
        TelemetryReporter {
            commands,
            stats,
            cancel,
            task: Some(task),
        }
    }

    /// Flips the check-in flag; a change reschedules and sends immediately.
    pub fn set_checkin(&self, active: bool) {
        let _ = self.commands.send(Command::SetCheckin(active));
    }

    /// Sends one record outside the regular interval.
    pub fn report_now(&self) {
        let _ = self.commands.send(Command::ReportNow);
    }

    /// Replays the offline queue now.
    pub fn flush(&self) {
        let _ = self.commands.send(Command::Flush);
    }

    pub fn stats(&self) -> ReporterStats {
        *self.stats.borrow()
    }

    pub fn subscribe_stats(&self) -> watch::Receiver<ReporterStats> {
        self.stats.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Stops the timer and hands back the core. Idempotent.
    ///
    /// A send still in flight is abandoned and its record queued. Tells the
    /// backend this device went offline; that request is not awaited.
    pub async fn stop(&mut self) -> Option<ReporterCore> {
        let task = self.task.take()?;
        self.cancel.cancel();
        let core = match task.await {
            Ok(core) => core,
            Err(e) => {
                warn!("telemetry reporter task failed: {}", e);
                return None;
            }
        };

        let sink = core.sink();
        tokio::spawn(async move {
            if let Err(e) = sink.mark_offline().await {
                debug!("mark offline failed: {}", e);
            }
        });
        info!("telemetry reporter stopped");
        Some(core)
    }
}

impl Drop for TelemetryReporter {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn schedule(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

struct Runner {
    core: ReporterCore,
    stats: ReporterStats,
    stats_tx: watch::Sender<ReporterStats>,
    cancel: CancellationToken,
}

impl Runner {
    /// Sends one record. Returns false if cancelled mid-send; the record is
    /// queued for the next session instead.
    async fn tick(&mut self) -> bool {
        self.stats.ticks += 1;
        let record = self.core.build_record();
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            outcome = self.core.report(record.clone()) => Some(outcome),
        };
        let Some(outcome) = outcome else {
            match self.core.queue.enqueue(&record) {
                Ok(()) => debug!("reporter stopped mid-send; telemetry queued"),
                Err(e) => warn!("telemetry record lost, queue unavailable: {}", e),
            }
            self.publish();
            return false;
        };
        match outcome {
            Ok(ReportOutcome::Delivered) => self.stats.delivered += 1,
            Ok(ReportOutcome::Queued) => self.stats.queued += 1,
            Ok(ReportOutcome::Dropped) => self.stats.dropped += 1,
            Err(e) => warn!("telemetry record lost, queue unavailable: {}", e),
        }
        self.publish();
        true
    }

    /// Replays the queue. Returns false if cancelled; unsent records stay queued.
    async fn flush(&mut self) -> bool {
        let summary = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            summary = self.core.flush() => Some(summary),
        };
        let Some(summary) = summary else {
            debug!("reporter stopped mid-flush");
            self.publish();
            return false;
        };
        match summary {
            Ok(summary) => {
                self.stats.replayed += summary.delivered as u64;
                self.stats.dropped += summary.dropped as u64;
            }
            Err(e) => warn!("offline queue flush failed: {}", e),
        }
        self.publish();
        true
    }

    fn publish(&mut self) {
        match self.core.queue.len() {
            Ok(pending) => self.stats.pending = pending,
            Err(e) => warn!("offline queue unreadable: {}", e),
        }
        self.stats_tx.send_replace(self.stats);
    }
}

async fn run(
    core: ReporterCore,
    config: ReporterConfig,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut network: NetworkSubscription,
    stats_tx: watch::Sender<ReporterStats>,
    cancel: CancellationToken,
) -> ReporterCore {
    let stats = *stats_tx.borrow();
    let mut runner = Runner {
        core,
        stats,
        stats_tx,
        cancel: cancel.clone(),
    };
    let mut interval = schedule(config.interval_for(runner.core.checkin_active));

    if runner.core.online && !runner.flush().await {
        return runner.core;
    }
    if !runner.tick().await {
        return runner.core;
    }

    loop {
        let completed = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            Some(command) = commands.recv() => match command {
                Command::SetCheckin(active) => {
                    if active == runner.core.checkin_active {
                        continue;
                    }
                    runner.core.set_checkin(active);
                    let period = config.interval_for(active);
                    interval = schedule(period);
                    runner.stats.interval = period;
                    debug!(active, ?period, "check-in changed, interval rescheduled");
                    runner.tick().await
                }
                Command::ReportNow => runner.tick().await,
                Command::Flush => runner.flush().await,
            },
            Some(online) = network.changed() => {
                runner.core.set_online(online);
                !online || (runner.flush().await && runner.tick().await)
            }
            _ = interval.tick() => runner.tick().await,
        };
        if !completed {
            break;
        }
    }

    runner.core
}

#[cfg(test)]
#[path = "reporter_tests.rs"]
mod tests;
