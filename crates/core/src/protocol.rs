// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Real-time channel frames and typed server events.
//!
//! Frames are JSON text messages tagged by `type`:
//! - Client sends an `auth` frame first, then `emit` frames (`join:user`).
//! - Server sends `event` frames carrying a named event and its payload,
//!   and may send a `disconnect` frame before closing the socket.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::campaign::Campaign;
use crate::error::{Error, Result};
use crate::role::Role;

/// Event names used on the channel.
pub mod events {
    pub const JOIN_USER: &str = "join:user";
    pub const ROLE_EVOLUTION: &str = "role:evolution";
    pub const CAMPAIGN_NEW: &str = "campaign:new";
    pub const CAMPAIGN_REMOVED: &str = "campaign:removed";
    pub const XP_GAINED: &str = "xp:gained";
    pub const CAMPAIGN_WINNER: &str = "campaign:winner";
    pub const BADGE_EARNED: &str = "badge:earned";
    pub const LUNCH_REMINDER: &str = "lunch:reminder";
    pub const LUNCH_LEAVING_PROMPT: &str = "lunch:leavingPrompt";
    pub const CONTRIBUTION_APPROVED: &str = "contribution:approved";
    pub const CONTRIBUTION_REJECTED: &str = "contribution:rejected";
    /// Local dispatch emitted after a resync with the unseen campaigns.
    pub const CAMPAIGN_UNSEEN: &str = "campaign:unseen";
}

/// Credentials presented when the channel opens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthPayload {
    pub token: String,
}

/// Frames sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// First frame on every connection: `{"type":"auth","auth":{"token":..}}`.
    Auth { auth: AuthPayload },
    /// A named event with a payload.
    Emit { event: String, data: Value },
}

impl ClientFrame {
    pub fn auth(token: impl Into<String>) -> Self {
        ClientFrame::Auth {
            auth: AuthPayload {
                token: token.into(),
            },
        }
    }

    /// Joins the user-scoped room so personal events reach only this user.
    pub fn join_user(user_id: impl Into<String>) -> Self {
        ClientFrame::Emit {
            event: events::JOIN_USER.to_string(),
            data: Value::String(user_id.into()),
        }
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Frames sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// A named event.
    Event {
        event: String,
        #[serde(default)]
        data: Value,
    },
    /// The server is closing this connection on purpose.
    Disconnect {
        #[serde(default)]
        reason: Option<String>,
    },
}

impl ServerFrame {
    pub fn event(event: impl Into<String>, data: Value) -> Self {
        ServerFrame::Event {
            event: event.into(),
            data,
        }
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Why a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server closed the connection deliberately.
    ServerInitiated,
    /// This client closed the connection.
    ClientInitiated,
    /// The underlying stream ended without a close handshake.
    TransportClose,
    /// The underlying stream failed.
    TransportError,
}

impl DisconnectReason {
    /// Conventional reason strings, matching the backend's logging.
    pub fn as_str(self) -> &'static str {
        match self {
            DisconnectReason::ServerInitiated => "io server disconnect",
            DisconnectReason::ClientInitiated => "io client disconnect",
            DisconnectReason::TransportClose => "transport close",
            DisconnectReason::TransportError => "transport error",
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of `role:evolution`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleEvolution {
    #[serde(deserialize_with = "crate::id::flexible")]
    pub user_id: String,
    #[serde(default)]
    pub old_role: Option<Role>,
    pub new_role: Role,
}

impl RoleEvolution {
    pub fn is_promotion(&self) -> bool {
        Role::is_promotion(self.old_role.unwrap_or_default(), self.new_role)
    }
}

/// Payload of `campaign:new`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignAnnouncement {
    #[serde(flatten)]
    pub campaign: Campaign,
    /// Resend: show again even if already seen.
    #[serde(default)]
    pub force_show: bool,
}

/// Payload of `campaign:removed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRemoved {
    #[serde(deserialize_with = "crate::id::flexible")]
    pub campaign_id: String,
    #[serde(default)]
    pub campaign_name: Option<String>,
}

/// Payload of `xp:gained`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpGained {
    pub amount: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

/// A decoded server event.
///
/// Events whose payload the client does not interpret are kept as raw JSON
/// and only forwarded to the notifier.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    RoleEvolution(RoleEvolution),
    CampaignNew(CampaignAnnouncement),
    CampaignRemoved(CampaignRemoved),
    XpGained(XpGained),
    CampaignWinner(Value),
    BadgeEarned(Value),
    LunchReminder(Value),
    LunchLeavingPrompt(Value),
    ContributionApproved(Value),
    ContributionRejected(Value),
}

impl RealtimeEvent {
    /// Decodes a named event. Unknown names yield `Ok(None)`.
    pub fn decode(name: &str, data: &Value) -> Result<Option<Self>> {
        let event = match name {
            events::ROLE_EVOLUTION => RealtimeEvent::RoleEvolution(typed(name, data)?),
            events::CAMPAIGN_NEW => RealtimeEvent::CampaignNew(typed(name, data)?),
            events::CAMPAIGN_REMOVED => RealtimeEvent::CampaignRemoved(typed(name, data)?),
            events::XP_GAINED => RealtimeEvent::XpGained(typed(name, data)?),
            events::CAMPAIGN_WINNER => RealtimeEvent::CampaignWinner(data.clone()),
            events::BADGE_EARNED => RealtimeEvent::BadgeEarned(data.clone()),
            events::LUNCH_REMINDER => RealtimeEvent::LunchReminder(data.clone()),
            events::LUNCH_LEAVING_PROMPT => RealtimeEvent::LunchLeavingPrompt(data.clone()),
            events::CONTRIBUTION_APPROVED => RealtimeEvent::ContributionApproved(data.clone()),
            events::CONTRIBUTION_REJECTED => RealtimeEvent::ContributionRejected(data.clone()),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// The wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            RealtimeEvent::RoleEvolution(_) => events::ROLE_EVOLUTION,
            RealtimeEvent::CampaignNew(_) => events::CAMPAIGN_NEW,
            RealtimeEvent::CampaignRemoved(_) => events::CAMPAIGN_REMOVED,
            RealtimeEvent::XpGained(_) => events::XP_GAINED,
            RealtimeEvent::CampaignWinner(_) => events::CAMPAIGN_WINNER,
            RealtimeEvent::BadgeEarned(_) => events::BADGE_EARNED,
            RealtimeEvent::LunchReminder(_) => events::LUNCH_REMINDER,
            RealtimeEvent::LunchLeavingPrompt(_) => events::LUNCH_LEAVING_PROMPT,
            RealtimeEvent::ContributionApproved(_) => events::CONTRIBUTION_APPROVED,
            RealtimeEvent::ContributionRejected(_) => events::CONTRIBUTION_REJECTED,
        }
    }
}

fn typed<T: serde::de::DeserializeOwned>(name: &str, data: &Value) -> Result<T> {
    T::deserialize(data).map_err(|e| Error::MalformedEvent {
        event: name.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
