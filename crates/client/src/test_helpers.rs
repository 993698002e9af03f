// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fakes for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use fieldsync_core::{
    BatteryStatus, CampaignList, ClientFrame, DisconnectReason, FixError, GeofenceState,
    Position, ServerFrame, TelemetryPayload, TelemetryRecord,
};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::api::{BoxFuture, DeliveryError, ResyncSource, TelemetrySink};
use crate::context::{Notifier, UiCollaborator};
use crate::position::{PositionProvider, PositionSource, WatchOptions};
use crate::realtime::ConnectionState;
use crate::sync::{Inbound, Transport, TransportError, TransportResult};

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_772_000_000 + secs, 0).unwrap()
}

/// A record whose latitude encodes `n`, for order checks.
pub fn record(n: u32) -> TelemetryRecord {
    let position = Position::new(-23.0 - f64::from(n) / 1000.0, -46.0, at(i64::from(n)));
    TelemetryRecord::new(
        Some(position),
        BatteryStatus::from_fraction(0.5, false),
        false,
        false,
        at(i64::from(n)),
    )
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TransportLog {
    connects: Vec<String>,
    sent: Vec<ClientFrame>,
    disconnects: usize,
}

/// Controls a [`MockTransport`] from the test side.
#[derive(Clone)]
pub struct MockServer {
    log: Arc<Mutex<TransportLog>>,
    inbound: mpsc::UnboundedSender<Inbound>,
    fail_connects: Arc<AtomicU32>,
}

impl MockServer {
    /// Tokens presented on each connect attempt, successful or not.
    pub fn connect_tokens(&self) -> Vec<String> {
        self.log.lock().unwrap().connects.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.log.lock().unwrap().connects.len()
    }

    pub fn sent(&self) -> Vec<ClientFrame> {
        self.log.lock().unwrap().sent.clone()
    }

    pub fn disconnects(&self) -> usize {
        self.log.lock().unwrap().disconnects
    }

    /// Fails the next `n` connect attempts.
    pub fn fail_next_connects(&self, n: u32) {
        self.fail_connects.store(n, Ordering::SeqCst);
    }

    pub fn fail_all_connects(&self) {
        self.fail_connects.store(u32::MAX, Ordering::SeqCst);
    }

    pub fn push_event(&self, event: &str, data: Value) {
        let _ = self
            .inbound
            .send(Inbound::Frame(ServerFrame::event(event, data)));
    }

    pub fn close(&self, reason: DisconnectReason) {
        let _ = self.inbound.send(Inbound::Closed(reason));
    }
}

pub struct MockTransport {
    connected: bool,
    log: Arc<Mutex<TransportLog>>,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    fail_connects: Arc<AtomicU32>,
}

pub fn mock_transport() -> (MockTransport, MockServer) {
    let (tx, rx) = mpsc::unbounded_channel();
    let log = Arc::new(Mutex::new(TransportLog::default()));
    let fail_connects = Arc::new(AtomicU32::new(0));
    (
        MockTransport {
            connected: false,
            log: Arc::clone(&log),
            inbound: rx,
            fail_connects: Arc::clone(&fail_connects),
        },
        MockServer {
            log,
            inbound: tx,
            fail_connects,
        },
    )
}

impl Transport for MockTransport {
    fn connect<'a>(
        &'a mut self,
        _url: &'a str,
        token: &'a str,
    ) -> BoxFuture<'a, TransportResult<()>> {
        Box::pin(async move {
            self.log.lock().unwrap().connects.push(token.to_string());
            let remaining = self.fail_connects.load(Ordering::SeqCst);
            if remaining > 0 {
                if remaining != u32::MAX {
                    self.fail_connects.store(remaining - 1, Ordering::SeqCst);
                }
                return Err(TransportError::ConnectionFailed("mock refused".into()));
            }
            self.connected = true;
            Ok(())
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            if self.connected {
                self.log.lock().unwrap().disconnects += 1;
            }
            self.connected = false;
            Ok(())
        })
    }

    fn send(&mut self, frame: ClientFrame) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            if !self.connected {
                return Err(TransportError::ConnectionClosed);
            }
            self.log.lock().unwrap().sent.push(frame);
            Ok(())
        })
    }

    fn recv(&mut self) -> BoxFuture<'_, TransportResult<Inbound>> {
        Box::pin(async move {
            if !self.connected {
                return Err(TransportError::ConnectionClosed);
            }
            match self.inbound.recv().await {
                Some(Inbound::Closed(reason)) => {
                    self.connected = false;
                    Ok(Inbound::Closed(reason))
                }
                Some(frame) => Ok(frame),
                None => std::future::pending().await,
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Records deliveries; replies from a script, then succeeds.
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<TelemetryPayload>>,
    script: Mutex<VecDeque<Result<(), DeliveryError>>>,
    mark_offline: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues replies for the next deliveries, in order.
    pub fn script(&self, replies: impl IntoIterator<Item = Result<(), DeliveryError>>) {
        self.script.lock().unwrap().extend(replies);
    }

    /// Payloads the backend accepted.
    pub fn delivered(&self) -> Vec<TelemetryPayload> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }

    pub fn mark_offline_count(&self) -> usize {
        self.mark_offline.load(Ordering::SeqCst)
    }
}

impl TelemetrySink for RecordingSink {
    fn deliver<'a>(
        &'a self,
        payload: &'a TelemetryPayload,
    ) -> BoxFuture<'a, Result<(), DeliveryError>> {
        Box::pin(async move {
            let reply = self.script.lock().unwrap().pop_front().unwrap_or(Ok(()));
            if reply.is_ok() {
                self.delivered.lock().unwrap().push(payload.clone());
            }
            reply
        })
    }

    fn mark_offline(&self) -> BoxFuture<'_, Result<(), DeliveryError>> {
        Box::pin(async move {
            self.mark_offline.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

/// Counts resyncs and returns a fixed campaign list.
#[derive(Default)]
pub struct MockResync {
    calls: AtomicUsize,
    list: Mutex<CampaignList>,
}

impl MockResync {
    pub fn new(list: CampaignList) -> Arc<Self> {
        Arc::new(MockResync {
            calls: AtomicUsize::new(0),
            list: Mutex::new(list),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ResyncSource for MockResync {
    fn fetch_campaigns(&self) -> BoxFuture<'_, Result<CampaignList, DeliveryError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.list.lock().unwrap().clone())
        })
    }
}

/// A backend that accepts requests and never answers them.
#[derive(Default)]
pub struct StalledBackend {
    calls: AtomicUsize,
}

impl StalledBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Requests started, across every endpoint.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TelemetrySink for StalledBackend {
    fn deliver<'a>(
        &'a self,
        _payload: &'a TelemetryPayload,
    ) -> BoxFuture<'a, Result<(), DeliveryError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(std::future::pending())
    }

    fn mark_offline(&self) -> BoxFuture<'_, Result<(), DeliveryError>> {
        Box::pin(std::future::pending())
    }
}

impl ResyncSource for StalledBackend {
    fn fetch_campaigns(&self) -> BoxFuture<'_, Result<CampaignList, DeliveryError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(std::future::pending())
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|(name, _)| name).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn dispatch(&self, event: &str, payload: &Value) {
        self.events
            .lock()
            .unwrap()
            .push((event.to_string(), payload.clone()));
    }
}

#[derive(Default)]
pub struct RecordingUi {
    geofence: Mutex<Vec<(GeofenceState, Option<u32>)>>,
    connectivity: Mutex<Vec<bool>>,
    realtime: Mutex<Vec<ConnectionState>>,
}

impl RecordingUi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn geofence(&self) -> Vec<(GeofenceState, Option<u32>)> {
        self.geofence.lock().unwrap().clone()
    }

    pub fn connectivity(&self) -> Vec<bool> {
        self.connectivity.lock().unwrap().clone()
    }

    pub fn realtime(&self) -> Vec<ConnectionState> {
        self.realtime.lock().unwrap().clone()
    }
}

impl UiCollaborator for RecordingUi {
    fn on_geofence_state_changed(&self, state: GeofenceState, distance_m: Option<u32>) {
        self.geofence.lock().unwrap().push((state, distance_m));
    }

    fn on_connectivity_changed(&self, online: bool) {
        self.connectivity.lock().unwrap().push(online);
    }

    fn on_realtime_state_changed(&self, state: ConnectionState) {
        self.realtime.lock().unwrap().push(state);
    }
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Position provider fed from the test. Each `open` takes the pending feed;
/// later opens get a source that never yields.
pub struct ScriptedPositions {
    feed: Mutex<Option<mpsc::UnboundedReceiver<Result<Position, FixError>>>>,
    opens: AtomicUsize,
}

#[derive(Clone)]
pub struct PositionFeed {
    tx: mpsc::UnboundedSender<Result<Position, FixError>>,
}

impl PositionFeed {
    pub fn fix(&self, latitude: f64, longitude: f64) {
        let _ = self.tx.send(Ok(Position::new(latitude, longitude, Utc::now())));
    }

    pub fn fail(&self, error: FixError) {
        let _ = self.tx.send(Err(error));
    }
}

impl ScriptedPositions {
    pub fn new() -> (Arc<Self>, PositionFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(ScriptedPositions {
                feed: Mutex::new(Some(rx)),
                opens: AtomicUsize::new(0),
            }),
            PositionFeed { tx },
        )
    }

    /// Replaces the feed handed to the next `open`.
    pub fn refeed(&self) -> PositionFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.feed.lock().unwrap() = Some(rx);
        PositionFeed { tx }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

struct ScriptedSource {
    rx: Option<mpsc::UnboundedReceiver<Result<Position, FixError>>>,
}

impl PositionSource for ScriptedSource {
    fn next_fix(&mut self) -> BoxFuture<'_, Option<Result<Position, FixError>>> {
        Box::pin(async move {
            match self.rx.as_mut() {
                // A closed feed behaves like a silent GPS, not an ended stream.
                Some(rx) => match rx.recv().await {
                    Some(outcome) => Some(outcome),
                    None => std::future::pending().await,
                },
                None => std::future::pending().await,
            }
        })
    }
}

impl PositionProvider for ScriptedPositions {
    fn open(&self, _options: &WatchOptions) -> Box<dyn PositionSource> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Box::new(ScriptedSource {
            rx: self.feed.lock().unwrap().take(),
        })
    }
}
