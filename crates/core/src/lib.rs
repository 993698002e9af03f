// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! fieldsync-core: Shared domain types for the fieldsync client
//!
//! This crate holds the pure parts of the field-tracking client: geofence
//! math and state transitions, telemetry records and their wire payloads,
//! the real-time protocol frames, and the role/campaign models that server
//! events carry. Nothing here performs I/O.

pub mod campaign;
pub mod error;
pub mod geo;
pub mod geofence;
pub mod id;
pub mod protocol;
pub mod role;
pub mod telemetry;

pub use campaign::{unseen, Campaign, CampaignList, SeenCampaigns};
pub use error::{Error, Result};
pub use geo::{
    evaluate, haversine_m, GeofenceAnchor, GeofenceCheck, Position, DEFAULT_GEOFENCE_RADIUS_M,
    EARTH_RADIUS_M,
};
pub use geofence::{FixError, GeofenceState, GeofenceUpdate};
pub use protocol::{ClientFrame, DisconnectReason, RealtimeEvent, ServerFrame};
pub use role::Role;
pub use telemetry::{BatteryStatus, TelemetryErrorReason, TelemetryPayload, TelemetryRecord};
