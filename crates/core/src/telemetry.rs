// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Telemetry records and the location POST body.
//!
//! A [`TelemetryRecord`] is what the reporter captures on each tick and what
//! the offline queue persists. [`TelemetryPayload`] is the flat wire shape
//! the backend expects.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Position;
use crate::geofence::FixError;

/// Battery level (0..=100) and charging flag, each unknown when the host
/// cannot report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatteryStatus {
    pub level: Option<u8>,
    pub charging: Option<bool>,
}

impl BatteryStatus {
    /// Converts a 0.0..=1.0 level fraction to a rounded percentage.
    pub fn from_fraction(fraction: f64, charging: bool) -> Self {
        let level = if fraction.is_finite() {
            Some((fraction.clamp(0.0, 1.0) * 100.0).round() as u8)
        } else {
            None
        };
        BatteryStatus {
            level,
            charging: Some(charging),
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }
}

/// Why a record carries no position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryErrorReason {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

impl From<FixError> for TelemetryErrorReason {
    fn from(e: FixError) -> Self {
        match e {
            FixError::PermissionDenied => TelemetryErrorReason::PermissionDenied,
            FixError::Timeout => TelemetryErrorReason::Timeout,
            FixError::Unavailable => TelemetryErrorReason::PositionUnavailable,
        }
    }
}

/// One telemetry sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    /// Latest fix, or `None` when location failed or none has arrived.
    pub position: Option<Position>,
    pub battery: BatteryStatus,
    pub is_online: bool,
    pub has_active_checkin: bool,
    pub captured_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<TelemetryErrorReason>,
}

impl TelemetryRecord {
    pub fn new(
        position: Option<Position>,
        battery: BatteryStatus,
        is_online: bool,
        has_active_checkin: bool,
        captured_at: DateTime<Utc>,
    ) -> Self {
        TelemetryRecord {
            position,
            battery,
            is_online,
            has_active_checkin,
            captured_at,
            error_reason: None,
        }
    }

    /// Drops the position and records why.
    pub fn with_error(mut self, reason: TelemetryErrorReason) -> Self {
        self.position = None;
        self.error_reason = Some(reason);
        self
    }

    /// Builds the wire body. `was_queued` marks replays from the offline queue.
    pub fn to_payload(&self, was_queued: bool) -> TelemetryPayload {
        let p = self.position.as_ref();
        TelemetryPayload {
            latitude: p.map(|p| p.latitude),
            longitude: p.map(|p| p.longitude),
            accuracy: p.and_then(|p| p.accuracy),
            heading: p.and_then(|p| p.heading),
            speed: p.and_then(|p| p.speed),
            is_online: self.is_online,
            battery_level: self.battery.level,
            is_charging: self.battery.charging,
            has_active_checkin: self.has_active_checkin,
            timestamp: self.captured_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            error: self.error_reason,
            was_queued,
        }
    }
}

/// JSON body of `POST /api/mobile/location`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryPayload {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub is_online: bool,
    pub battery_level: Option<u8>,
    pub is_charging: Option<bool>,
    pub has_active_checkin: bool,
    /// ISO-8601 capture time.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TelemetryErrorReason>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub was_queued: bool,
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod tests;
