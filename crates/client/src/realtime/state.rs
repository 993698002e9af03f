// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Lifecycle of the real-time connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// First connection of a cycle is being established.
    Connecting,
    Connected,
    /// Re-establishing after a drop.
    Reconnecting,
    /// Attempt budget exhausted. Needs an external restart.
    Failed,
}

impl ConnectionState {
    /// Allowed edges. Any state may return to `Disconnected` on stop or
    /// when the session has no token left to reconnect with.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        match (self, next) {
            (_, Disconnected) => self != Disconnected,
            (Disconnected, Connecting) | (Failed, Connecting) => true,
            (Connecting, Connected) | (Connecting, Failed) => true,
            (Connected, Reconnecting) => true,
            (Reconnecting, Connected) | (Reconnecting, Failed) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Published channel status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStatus {
    pub state: ConnectionState,
    /// Attempt number within the current connect cycle; 0 once connected.
    pub attempt: u32,
    /// Successful connections over the channel's lifetime.
    pub connects: u32,
    /// Resyncs issued after reconnections.
    pub resyncs: u32,
}

impl ChannelStatus {
    /// Human-readable status line.
    pub fn status_string(&self) -> String {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Reconnecting if self.attempt > 0 => {
                format!("{} (attempt {})", self.state, self.attempt)
            }
            state => state.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
