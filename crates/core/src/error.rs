// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for fieldsync-core operations.

use thiserror::Error;

/// All possible errors that can occur in fieldsync-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid {field}: {value}\n  hint: {field} must be a finite number in {range}")]
    InvalidCoordinate {
        field: &'static str,
        value: f64,
        range: &'static str,
    },

    #[error("invalid geofence radius: {0}\n  hint: radius must be a positive number of meters")]
    InvalidRadius(f64),

    #[error("malformed payload for event '{event}': {reason}")]
    MalformedEvent { event: String, reason: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for fieldsync-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
