// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::api::DeliveryError;
use crate::sync::QueueError;

/// Errors surfaced by the fieldsync runtime.
///
/// Component loops never return these across their public boundary; they
/// appear from configuration, startup, and the binary's own plumbing.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config not found: {0}\n  hint: pass --config or create the file")]
    ConfigNotFound(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid anchor '{0}'\n  hint: expected lat,lon or lat,lon,radius")]
    InvalidAnchor(String),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Core(#[from] fieldsync_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
