// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Battery readings attached to each telemetry record.

use std::sync::RwLock;

use fieldsync_core::BatteryStatus;

/// Host battery API.
pub trait BatterySource: Send + Sync {
    fn status(&self) -> BatteryStatus;
}

/// A host without battery information. Reports unknown level and charging.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBattery;

impl BatterySource for NoBattery {
    fn status(&self) -> BatteryStatus {
        BatteryStatus::unknown()
    }
}

/// Battery status pushed by the host whenever it changes.
#[derive(Debug, Default)]
pub struct SharedBattery {
    status: RwLock<BatteryStatus>,
}

impl SharedBattery {
    pub fn new(status: BatteryStatus) -> Self {
        SharedBattery {
            status: RwLock::new(status),
        }
    }

    pub fn update(&self, status: BatteryStatus) {
        *self.status.write().unwrap_or_else(|e| e.into_inner()) = status;
    }
}

impl BatterySource for SharedBattery {
    fn status(&self) -> BatteryStatus {
        *self.status.read().unwrap_or_else(|e| e.into_inner())
    }
}
