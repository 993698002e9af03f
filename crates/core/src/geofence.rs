// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Geofence state machine.
//!
//! ```text
//!            fix + anchor            fix + anchor
//! Loading ────────────────► Valid ◄──────────────► Invalid
//!    │                        │  ▲                    │
//!    │ timeout/unavailable    ▼  │ later fix          ▼
//!    └──────────────────────► Error ◄─────────────────┘
//!    │
//!    └── permission denied ──► PermissionDenied (sticky until restart)
//! ```
//!
//! The transition is a pure function of the previous state, the watch
//! outcome and the anchor; rendering is left to the caller.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geo::{evaluate, GeofenceAnchor, Position};

/// Geofence validity as seen by the check-in gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeofenceState {
    /// Waiting for the first fix.
    #[default]
    Loading,
    /// Inside the project's geofence.
    Valid,
    /// Outside the project's geofence.
    Invalid,
    /// The host refused location access.
    PermissionDenied,
    /// The fix timed out, the position was unavailable, or no anchor exists.
    Error,
}

impl GeofenceState {
    /// Only `Valid` permits a check-in.
    pub fn permits_checkin(self) -> bool {
        matches!(self, GeofenceState::Valid)
    }

    /// Whether the live distance is meaningful in this state.
    pub fn shows_distance(self) -> bool {
        matches!(self, GeofenceState::Valid | GeofenceState::Invalid)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GeofenceState::Loading => "loading",
            GeofenceState::Valid => "valid",
            GeofenceState::Invalid => "invalid",
            GeofenceState::PermissionDenied => "permission_denied",
            GeofenceState::Error => "error",
        }
    }
}

impl fmt::Display for GeofenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified failure from a position watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixError {
    PermissionDenied,
    Timeout,
    Unavailable,
}

impl fmt::Display for FixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixError::PermissionDenied => f.write_str("location permission denied"),
            FixError::Timeout => f.write_str("position fix timed out"),
            FixError::Unavailable => f.write_str("position unavailable"),
        }
    }
}

/// A geofence state paired with the rounded distance that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeofenceUpdate {
    pub state: GeofenceState,
    /// Rounded meters to the anchor; present only in `Valid`/`Invalid`.
    pub distance_m: Option<u32>,
}

impl GeofenceUpdate {
    /// The state before any fix arrives.
    pub fn loading() -> Self {
        GeofenceUpdate::default()
    }

    fn without_distance(state: GeofenceState) -> Self {
        GeofenceUpdate {
            state,
            distance_m: None,
        }
    }

    /// Computes the next state from a watch outcome.
    ///
    /// `PermissionDenied` is sticky: once entered, only a fresh watch
    /// (starting again from [`GeofenceUpdate::loading`]) can leave it.
    pub fn next(
        previous: GeofenceState,
        outcome: Result<&Position, FixError>,
        anchor: Option<&GeofenceAnchor>,
    ) -> Self {
        if previous == GeofenceState::PermissionDenied {
            return Self::without_distance(GeofenceState::PermissionDenied);
        }

        match outcome {
            Err(FixError::PermissionDenied) => {
                Self::without_distance(GeofenceState::PermissionDenied)
            }
            Err(FixError::Timeout | FixError::Unavailable) => {
                Self::without_distance(GeofenceState::Error)
            }
            Ok(position) => {
                let Some(anchor) = anchor else {
                    return Self::without_distance(GeofenceState::Error);
                };
                if position.validate().is_err() {
                    return Self::without_distance(GeofenceState::Error);
                }
                let check = evaluate(position, anchor);
                GeofenceUpdate {
                    state: if check.within {
                        GeofenceState::Valid
                    } else {
                        GeofenceState::Invalid
                    },
                    distance_m: Some(check.display_distance_m()),
                }
            }
        }
    }

    /// A short explanation of why check-in is unavailable, or `None` when it is.
    pub fn blocked_reason(&self, radius_m: f64) -> Option<String> {
        match self.state {
            GeofenceState::Valid => None,
            GeofenceState::Loading => Some("waiting for location".to_string()),
            GeofenceState::Invalid => Some(match self.distance_m {
                Some(d) => format!("outside project area ({}m, max {}m)", d, radius_m.round()),
                None => "outside project area".to_string(),
            }),
            GeofenceState::PermissionDenied => {
                Some("location permission denied; enable it in settings".to_string())
            }
            GeofenceState::Error => {
                Some("could not determine location; check that GPS is on".to_string())
            }
        }
    }
}

#[cfg(test)]
#[path = "geofence_tests.rs"]
mod tests;
