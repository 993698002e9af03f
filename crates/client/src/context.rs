// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Collaborator interfaces consumed by the sync layer.
//!
//! Screens, login, and notification rendering live outside this crate and
//! are reached only through these traits.

use std::sync::RwLock;

use fieldsync_core::{GeofenceAnchor, GeofenceState};
use serde_json::Value;
use tracing::info;

use crate::realtime::ConnectionState;

/// Read access to the signed-in session.
pub trait AuthContext: Send + Sync {
    fn current_token(&self) -> Option<String>;
    fn current_user_id(&self) -> Option<String>;
}

/// The project whose geofence gates check-in.
pub trait ProjectContext: Send + Sync {
    fn active_geofence_anchor(&self) -> Option<GeofenceAnchor>;
}

/// Rendering hooks. Implementations must return quickly.
pub trait UiCollaborator: Send + Sync {
    fn on_geofence_state_changed(&self, state: GeofenceState, distance_m: Option<u32>);
    fn on_connectivity_changed(&self, online: bool);
    fn on_realtime_state_changed(&self, _state: ConnectionState) {}
}

/// Receives named domain events (toasts, modals, badges).
pub trait Notifier: Send + Sync {
    fn dispatch(&self, event: &str, payload: &Value);
}

#[derive(Debug, Clone, Default)]
struct Session {
    token: Option<String>,
    user_id: Option<String>,
}

/// In-memory session updated by login/logout.
#[derive(Debug, Default)]
pub struct SessionAuth {
    session: RwLock<Session>,
}

impl SessionAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        let auth = Self::new();
        auth.sign_in(token, user_id);
        auth
    }

    pub fn sign_in(&self, token: impl Into<String>, user_id: impl Into<String>) {
        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        session.token = Some(token.into());
        session.user_id = Some(user_id.into());
    }

    pub fn sign_out(&self) {
        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        *session = Session::default();
    }

    fn read(&self) -> Session {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl AuthContext for SessionAuth {
    fn current_token(&self) -> Option<String> {
        self.read().token
    }

    fn current_user_id(&self) -> Option<String> {
        self.read().user_id
    }
}

/// A project context with a settable anchor.
#[derive(Debug, Default)]
pub struct FixedProject {
    anchor: RwLock<Option<GeofenceAnchor>>,
}

impl FixedProject {
    pub fn new(anchor: Option<GeofenceAnchor>) -> Self {
        FixedProject {
            anchor: RwLock::new(anchor),
        }
    }

    pub fn set_anchor(&self, anchor: Option<GeofenceAnchor>) {
        *self.anchor.write().unwrap_or_else(|e| e.into_inner()) = anchor;
    }
}

impl ProjectContext for FixedProject {
    fn active_geofence_anchor(&self) -> Option<GeofenceAnchor> {
        *self.anchor.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Writes UI hooks to the log. Used by the daemon.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogUi;

impl UiCollaborator for LogUi {
    fn on_geofence_state_changed(&self, state: GeofenceState, distance_m: Option<u32>) {
        match distance_m {
            Some(d) => info!(%state, distance_m = d, "geofence"),
            None => info!(%state, "geofence"),
        }
    }

    fn on_connectivity_changed(&self, online: bool) {
        info!(online, "connectivity");
    }

    fn on_realtime_state_changed(&self, state: ConnectionState) {
        info!(%state, "realtime");
    }
}

/// Writes dispatched events to the log. Used by the daemon.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn dispatch(&self, event: &str, payload: &Value) {
        info!(event, %payload, "notify");
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
