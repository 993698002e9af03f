// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Configuration is read from a TOML file. Every key is optional:
//! - `api_url`: base URL of the HTTP backend
//! - `[telemetry]`: reporting cadence and the offline queue location
//! - `[geofence]`: default radius and position fix timeout
//! - `[realtime]`: channel URL and reconnect budget

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fieldsync_core::GeofenceAnchor;

use crate::error::{Error, Result};

const STATE_DIR_NAME: &str = "fieldsync";
const QUEUE_FILE_NAME: &str = "telemetry_queue.jsonl";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the HTTP backend (telemetry, campaigns, push).
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub geofence: GeofenceConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

/// Telemetry reporting cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Interval while a check-in is active (default: 300000).
    #[serde(default = "default_interval_ms")]
    pub active_interval_ms: u64,
    /// Interval while no check-in is active (default: 300000).
    #[serde(default = "default_interval_ms")]
    pub inactive_interval_ms: u64,
    /// Keep reporting between check-ins (default: true).
    /// When false the reporter only runs while a check-in is active.
    #[serde(default = "default_true")]
    pub report_while_idle: bool,
    /// Offline queue file. Defaults to the state directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_path: Option<PathBuf>,
}

/// Geofence evaluation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceConfig {
    /// Radius used when the project does not define one (default: 200).
    #[serde(default = "default_radius_m")]
    pub default_radius_m: f64,
    /// Deadline for each position fix (default: 15000).
    #[serde(default = "default_fix_timeout_ms")]
    pub fix_timeout_ms: u64,
}

/// Real-time channel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeConfig {
    #[serde(default = "default_realtime_url")]
    pub url: String,
    /// Connection attempts before giving up (default: 10).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry (default: 1000).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound on any retry delay (default: 5000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Delay before the manual reconnect after a server-initiated close (default: 1000).
    #[serde(default = "default_server_disconnect_delay_ms")]
    pub server_disconnect_delay_ms: u64,
}

fn default_api_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_interval_ms() -> u64 {
    300_000
}

fn default_true() -> bool {
    true
}

fn default_radius_m() -> f64 {
    fieldsync_core::DEFAULT_GEOFENCE_RADIUS_M
}

fn default_fix_timeout_ms() -> u64 {
    15_000
}

fn default_realtime_url() -> String {
    "ws://localhost:3000/realtime".to_string()
}

fn default_max_attempts() -> u32 {
    10
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    5_000
}

fn default_server_disconnect_delay_ms() -> u64 {
    1_000
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        TelemetryConfig {
            active_interval_ms: default_interval_ms(),
            inactive_interval_ms: default_interval_ms(),
            report_while_idle: true,
            queue_path: None,
        }
    }
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        GeofenceConfig {
            default_radius_m: default_radius_m(),
            fix_timeout_ms: default_fix_timeout_ms(),
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        RealtimeConfig {
            url: default_realtime_url(),
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            server_disconnect_delay_ms: default_server_disconnect_delay_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: default_api_url(),
            telemetry: TelemetryConfig::default(),
            geofence: GeofenceConfig::default(),
            realtime: RealtimeConfig::default(),
        }
    }
}

impl Config {
    /// Loads and validates a config file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses and validates TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.telemetry.active_interval_ms == 0 || self.telemetry.inactive_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "telemetry intervals must be greater than zero".to_string(),
            ));
        }
        if self.realtime.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "realtime.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.realtime.initial_delay_ms > self.realtime.max_delay_ms {
            return Err(Error::InvalidConfig(format!(
                "realtime.initial_delay_ms ({}) exceeds max_delay_ms ({})",
                self.realtime.initial_delay_ms, self.realtime.max_delay_ms
            )));
        }
        if !(self.geofence.default_radius_m.is_finite() && self.geofence.default_radius_m > 0.0) {
            return Err(Error::InvalidConfig(
                "geofence.default_radius_m must be a positive number".to_string(),
            ));
        }
        if self.geofence.fix_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "geofence.fix_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The offline queue file, falling back to the state directory.
    pub fn queue_path(&self) -> PathBuf {
        match &self.telemetry.queue_path {
            Some(path) => path.clone(),
            None => default_state_dir().join(QUEUE_FILE_NAME),
        }
    }

    pub fn fix_timeout(&self) -> Duration {
        Duration::from_millis(self.geofence.fix_timeout_ms)
    }
}

/// Parses `lat,lon` or `lat,lon,radius` into an anchor.
pub fn parse_anchor(spec: &str, default_radius_m: f64) -> Result<GeofenceAnchor> {
    let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
    let number = |s: &str| {
        s.parse::<f64>()
            .map_err(|_| Error::InvalidAnchor(spec.to_string()))
    };
    let (lat, lon, radius) = match parts.as_slice() {
        [lat, lon] => (number(lat)?, number(lon)?, default_radius_m),
        [lat, lon, radius] => (number(lat)?, number(lon)?, number(radius)?),
        _ => return Err(Error::InvalidAnchor(spec.to_string())),
    };
    Ok(GeofenceAnchor::new(lat, lon, radius)?)
}

/// Per-user state directory (`<data_local_dir>/fieldsync`).
pub fn default_state_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(STATE_DIR_NAME)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
