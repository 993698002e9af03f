// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed position source for the daemon and field simulations.
//!
//! Each JSONL line is either a fix or a failure, with an optional pause
//! before it is delivered:
//!
//! ```text
//! {"latitude": -23.5505, "longitude": -46.6333, "accuracy": 8.0}
//! {"error": "timeout", "delayMs": 20000}
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fieldsync_core::{FixError, Position};
use serde::Deserialize;
use tokio::time::Instant;

use crate::api::BoxFuture;
use crate::error::{Error, Result};
use crate::position::{PositionProvider, PositionSource, WatchOptions};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplayLine {
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    accuracy: Option<f64>,
    #[serde(default)]
    heading: Option<f64>,
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default)]
    error: Option<FixError>,
    #[serde(default)]
    delay_ms: Option<u64>,
}

/// One scripted step.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayEntry {
    /// Pause before delivery; `None` uses the provider's pacing.
    pub delay: Option<Duration>,
    pub outcome: ReplayOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplayOutcome {
    Fix {
        latitude: f64,
        longitude: f64,
        accuracy: Option<f64>,
        heading: Option<f64>,
        speed: Option<f64>,
    },
    Error(FixError),
}

impl ReplayEntry {
    fn from_line(line: ReplayLine, number: usize) -> Result<Self> {
        let outcome = match (line.error, line.latitude, line.longitude) {
            (Some(error), _, _) => ReplayOutcome::Error(error),
            (None, Some(latitude), Some(longitude)) => ReplayOutcome::Fix {
                latitude,
                longitude,
                accuracy: line.accuracy,
                heading: line.heading,
                speed: line.speed,
            },
            _ => {
                return Err(Error::InvalidConfig(format!(
                    "replay line {}: needs latitude and longitude, or error",
                    number
                )))
            }
        };
        Ok(ReplayEntry {
            delay: line.delay_ms.map(Duration::from_millis),
            outcome,
        })
    }

    /// Materializes the outcome, stamping fixes with the current time.
    fn emit(&self) -> std::result::Result<Position, FixError> {
        match self.outcome {
            ReplayOutcome::Fix {
                latitude,
                longitude,
                accuracy,
                heading,
                speed,
            } => {
                let mut position = Position::new(latitude, longitude, Utc::now())
                    .with_motion(heading, speed);
                position.accuracy = accuracy;
                Ok(position)
            }
            ReplayOutcome::Error(error) => Err(error),
        }
    }
}

/// Replays a fixed script to every subscription.
#[derive(Debug, Clone)]
pub struct ReplayProvider {
    entries: Arc<Vec<ReplayEntry>>,
    pacing: Duration,
    looped: bool,
}

impl ReplayProvider {
    pub fn new(entries: Vec<ReplayEntry>, pacing: Duration, looped: bool) -> Self {
        ReplayProvider {
            entries: Arc::new(entries),
            pacing,
            looped,
        }
    }

    pub fn load(path: &Path, pacing: Duration, looped: bool) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::new(Self::parse(&content)?, pacing, looped))
    }

    pub fn parse(content: &str) -> Result<Vec<ReplayEntry>> {
        let mut entries = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let parsed: ReplayLine = serde_json::from_str(line)?;
            entries.push(ReplayEntry::from_line(parsed, i + 1)?);
        }
        Ok(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PositionProvider for ReplayProvider {
    fn open(&self, _options: &WatchOptions) -> Box<dyn PositionSource> {
        Box::new(ReplaySource {
            entries: Arc::clone(&self.entries),
            pacing: self.pacing,
            looped: self.looped,
            next: 0,
            due: None,
        })
    }
}

struct ReplaySource {
    entries: Arc<Vec<ReplayEntry>>,
    pacing: Duration,
    looped: bool,
    next: usize,
    /// When the pending entry is released; survives a dropped call.
    due: Option<Instant>,
}

impl PositionSource for ReplaySource {
    fn next_fix(&mut self) -> BoxFuture<'_, Option<std::result::Result<Position, FixError>>> {
        Box::pin(async move {
            if self.next >= self.entries.len() {
                if !self.looped || self.entries.is_empty() {
                    return None;
                }
                self.next = 0;
            }
            let entry = self.entries.get(self.next)?.clone();
            let pacing = self.pacing;
            let due = *self
                .due
                .get_or_insert_with(|| Instant::now() + entry.delay.unwrap_or(pacing));
            tokio::time::sleep_until(due).await;
            self.due = None;
            self.next += 1;
            Some(entry.emit())
        })
    }
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
