// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Great-circle distance and geofence classification.
//!
//! All inputs are in degrees. Distances are computed on a sphere of radius
//! [`EARTH_RADIUS_M`] with the haversine formula.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Mean Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Geofence radius applied when a project does not specify one.
pub const DEFAULT_GEOFENCE_RADIUS_M: f64 = 200.0;

/// A single position fix from the host's location source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters, when the source reports it.
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Direction of travel in degrees clockwise from true north.
    #[serde(default)]
    pub heading: Option<f64>,
    /// Ground speed in meters per second.
    #[serde(default)]
    pub speed: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

impl Position {
    /// Creates a fix with only coordinates and a capture time.
    pub fn new(latitude: f64, longitude: f64, captured_at: DateTime<Utc>) -> Self {
        Position {
            latitude,
            longitude,
            accuracy: None,
            heading: None,
            speed: None,
            captured_at,
        }
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_motion(mut self, heading: Option<f64>, speed: Option<f64>) -> Self {
        self.heading = heading;
        self.speed = speed;
        self
    }

    /// Checks that the coordinates are finite and within range.
    pub fn validate(&self) -> Result<()> {
        validate_coordinates(self.latitude, self.longitude)
    }
}

/// The center and radius of a project's geofence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceAnchor {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
}

impl GeofenceAnchor {
    /// Creates an anchor, rejecting out-of-range coordinates and non-positive radii.
    pub fn new(latitude: f64, longitude: f64, radius_meters: f64) -> Result<Self> {
        validate_coordinates(latitude, longitude)?;
        if !radius_meters.is_finite() || radius_meters <= 0.0 {
            return Err(Error::InvalidRadius(radius_meters));
        }
        Ok(GeofenceAnchor {
            latitude,
            longitude,
            radius_meters,
        })
    }

    /// Creates an anchor with [`DEFAULT_GEOFENCE_RADIUS_M`].
    pub fn with_default_radius(latitude: f64, longitude: f64) -> Result<Self> {
        Self::new(latitude, longitude, DEFAULT_GEOFENCE_RADIUS_M)
    }
}

/// Result of classifying a position against an anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceCheck {
    /// Unrounded great-circle distance in meters.
    pub distance_m: f64,
    /// `distance_m <= radius`; the boundary counts as inside.
    pub within: bool,
}

impl GeofenceCheck {
    /// Distance rounded to the nearest meter, for display.
    pub fn display_distance_m(&self) -> u32 {
        // Distances are bounded by half the Earth's circumference.
        self.distance_m.round() as u32
    }
}

/// Great-circle distance in meters between two points given in degrees.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for antipodal points.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Classifies a position against a geofence anchor.
pub fn evaluate(position: &Position, anchor: &GeofenceAnchor) -> GeofenceCheck {
    let distance_m = haversine_m(
        position.latitude,
        position.longitude,
        anchor.latitude,
        anchor.longitude,
    );
    GeofenceCheck {
        distance_m,
        within: distance_m <= anchor.radius_meters,
    }
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(Error::InvalidCoordinate {
            field: "latitude",
            value: latitude,
            range: "[-90, 90]",
        });
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(Error::InvalidCoordinate {
            field: "longitude",
            value: longitude,
            range: "[-180, 180]",
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "geo_tests.rs"]
mod tests;
