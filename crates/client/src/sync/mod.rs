// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Delivery plumbing shared by the reporter and the real-time channel.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Reporter   │────►│ OfflineQueue│     │   Backend   │
//! │             │◄────│   (JSONL)   │     │             │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ┌─────────────┐     ┌─────────────┐            ▲
//! │  Realtime   │────►│  Transport  │────────────┘
//! │  Channel    │◄────│   (trait)   │
//! └─────────────┘     └─────────────┘
//! ```

mod queue;
mod transport;

pub use queue::{OfflineQueue, QueueError, QueueResult};
pub use transport::{Inbound, Transport, TransportError, TransportResult, WebSocketTransport};

#[cfg(test)]
mod queue_tests;
