// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! fieldsync: telemetry and real-time sync for field-workforce clients
//!
//! The runtime layer over `fieldsync-core`:
//! - [`position::PositionWatcher`] turns the host's position stream into geofence state
//! - [`reporter::TelemetryReporter`] sends telemetry on an adaptive interval,
//!   queuing records while offline and replaying them on reconnect
//! - [`realtime::RealtimeChannel`] keeps the event channel alive and resyncs after reconnects
//! - [`coordinator::SyncCoordinator`] ties their lifecycles to session and check-in state

pub mod api;
pub mod battery;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod network;
pub mod position;
pub mod realtime;
pub mod replay;
pub mod reporter;
pub mod sync;

#[cfg(test)]
mod test_helpers;

pub use config::Config;
pub use coordinator::{Collaborators, Services, SyncCoordinator};
pub use error::{Error, Result};
pub use network::NetworkMonitor;
