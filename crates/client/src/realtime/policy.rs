// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reconnect schedule.

use std::time::Duration;

use crate::config::RealtimeConfig;

/// Bounded, non-decreasing reconnect schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Attempts per connect cycle before the channel gives up.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Wait before the manual attempt after a server-initiated close.
    pub server_disconnect_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::from(&RealtimeConfig::default())
    }
}

impl From<&RealtimeConfig> for ReconnectPolicy {
    fn from(config: &RealtimeConfig) -> Self {
        ReconnectPolicy {
            max_attempts: config.max_attempts,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            server_disconnect_delay: Duration::from_millis(config.server_disconnect_delay_ms),
        }
    }
}

impl ReconnectPolicy {
    /// Delay after the `failures`-th failed attempt: doubling from the
    /// initial delay, capped at the maximum. Zero failures means no delay.
    pub fn delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32 << (failures - 1).min(16);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Whether `attempts` used up the budget.
    pub fn exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
