// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Real-time event channel: connection lifecycle, reconnect policy, and
//! event routing into the session cache.

mod channel;
mod policy;
mod router;
mod state;

pub use channel::{ChannelSettings, RealtimeChannel};
pub use policy::ReconnectPolicy;
pub use router::{EventRouter, Routed, SessionCache, SessionCacheHandle};
pub use state::{ChannelStatus, ConnectionState};
