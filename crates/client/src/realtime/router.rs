// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Routing of named server events to their handlers.
//!
//! Handlers touch only the [`SessionCache`] and hand presentation to the
//! [`Notifier`]. Events are applied exactly as received: a repeated
//! `xp:gained` is counted twice.

use std::sync::Arc;

use fieldsync_core::protocol::events;
use fieldsync_core::{unseen, Campaign, CampaignList, RealtimeEvent, Role, SeenCampaigns};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::context::{AuthContext, Notifier};

/// State cached locally for the signed-in session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionCache {
    pub role: Option<Role>,
    pub campaigns: Vec<Campaign>,
    pub total_applicators: u64,
    pub seen: SeenCampaigns,
    /// Sum of every `xp:gained` amount received this session.
    pub xp_received: i64,
}

impl SessionCache {
    /// Campaigns the user has not dismissed yet.
    pub fn unseen_campaigns(&self) -> Vec<&Campaign> {
        unseen(&self.campaigns, &self.seen)
    }

    fn upsert_campaign(&mut self, campaign: Campaign) {
        match self.campaigns.iter_mut().find(|c| c.id == campaign.id) {
            Some(existing) => *existing = campaign,
            None => self.campaigns.push(campaign),
        }
    }
}

/// Shared handle to the session cache. Cloning yields another handle.
#[derive(Debug, Clone)]
pub struct SessionCacheHandle {
    tx: Arc<watch::Sender<SessionCache>>,
}

impl SessionCacheHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionCache::default());
        SessionCacheHandle { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> SessionCache {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionCache> {
        self.tx.subscribe()
    }

    pub fn update(&self, f: impl FnOnce(&mut SessionCache)) {
        self.tx.send_modify(f);
    }

    /// Records that the user saw a campaign.
    pub fn mark_seen(&self, campaign_id: &str) {
        self.update(|cache| {
            cache.seen.mark_seen(campaign_id);
        });
    }

    /// Replaces the campaign list after a refetch. Returns the unseen ones.
    pub fn replace_campaigns(&self, list: CampaignList) -> Vec<Campaign> {
        let mut fresh = Vec::new();
        self.update(|cache| {
            cache.campaigns = list.campaigns;
            cache.total_applicators = list.total_applicators;
            fresh = cache.unseen_campaigns().into_iter().cloned().collect();
        });
        fresh
    }

    /// Forgets everything cached, on logout.
    pub fn reset(&self) {
        self.tx.send_replace(SessionCache::default());
    }
}

impl Default for SessionCacheHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// What the router did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    Dispatched(&'static str),
    /// Addressed to another user.
    Ignored,
    Unknown,
    /// A known event whose payload did not decode. The cache is untouched;
    /// the raw payload is still forwarded unless its recipient is unknowable.
    Malformed,
}

/// Applies decoded events to the cache and forwards them to the notifier.
#[derive(Clone)]
pub struct EventRouter {
    cache: SessionCacheHandle,
    auth: Arc<dyn AuthContext>,
    notifier: Arc<dyn Notifier>,
}

impl EventRouter {
    pub fn new(
        cache: SessionCacheHandle,
        auth: Arc<dyn AuthContext>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        EventRouter {
            cache,
            auth,
            notifier,
        }
    }

    pub fn cache(&self) -> &SessionCacheHandle {
        &self.cache
    }

    pub fn handle(&self, name: &str, data: &Value) -> Routed {
        let event = match RealtimeEvent::decode(name, data) {
            Ok(Some(event)) => event,
            Ok(None) => {
                debug!(event = name, "unknown realtime event dropped");
                return Routed::Unknown;
            }
            Err(e) => {
                warn!("{}", e);
                // A role change can only be applied after checking whose it is.
                if name != events::ROLE_EVOLUTION {
                    self.notifier.dispatch(name, data);
                }
                return Routed::Malformed;
            }
        };

        let name = event.name();
        let payload = match event {
            RealtimeEvent::RoleEvolution(evolution) => {
                if self.auth.current_user_id().as_deref() != Some(evolution.user_id.as_str()) {
                    debug!(user = %evolution.user_id, "role change for another user ignored");
                    return Routed::Ignored;
                }
                let promotion = evolution.is_promotion();
                self.cache.update(|cache| cache.role = Some(evolution.new_role));
                with_field(data, "promotion", Value::Bool(promotion))
            }
            RealtimeEvent::CampaignNew(announcement) => {
                self.cache.update(|cache| {
                    if announcement.force_show {
                        cache.seen.forget(&announcement.campaign.id);
                    }
                    cache.upsert_campaign(announcement.campaign);
                });
                data.clone()
            }
            RealtimeEvent::CampaignRemoved(removed) => {
                self.cache
                    .update(|cache| cache.campaigns.retain(|c| c.id != removed.campaign_id));
                data.clone()
            }
            RealtimeEvent::XpGained(xp) => {
                self.cache.update(|cache| {
                    cache.xp_received = cache.xp_received.saturating_add(xp.amount)
                });
                data.clone()
            }
            RealtimeEvent::CampaignWinner(_)
            | RealtimeEvent::BadgeEarned(_)
            | RealtimeEvent::LunchReminder(_)
            | RealtimeEvent::LunchLeavingPrompt(_)
            | RealtimeEvent::ContributionApproved(_)
            | RealtimeEvent::ContributionRejected(_) => data.clone(),
        };

        self.notifier.dispatch(name, &payload);
        Routed::Dispatched(name)
    }

    /// Announces campaigns found by a resync.
    pub fn announce_unseen(&self, campaigns: &[Campaign]) {
        if campaigns.is_empty() {
            return;
        }
        match serde_json::to_value(campaigns) {
            Ok(payload) => self.notifier.dispatch(events::CAMPAIGN_UNSEEN, &payload),
            Err(e) => warn!("could not encode unseen campaigns: {}", e),
        }
    }
}

fn with_field(data: &Value, key: &str, value: Value) -> Value {
    let mut payload = data.clone();
    if let Value::Object(map) = &mut payload {
        map.insert(key.to_string(), value);
    }
    payload
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
