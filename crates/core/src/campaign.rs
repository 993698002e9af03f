// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Campaigns pushed by the backend and the client-side seen set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// An active campaign as returned by the campaigns endpoint or a
/// `campaign:new` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    #[serde(deserialize_with = "crate::id::flexible")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp_bonus: Option<i64>,
}

impl Campaign {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Campaign {
            id: id.into(),
            name: name.into(),
            description: None,
            banner_url: None,
            banner_type: None,
            xp_bonus: None,
        }
    }
}

/// Response body of the campaigns endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignList {
    #[serde(default)]
    pub campaigns: Vec<Campaign>,
    #[serde(default)]
    pub total_applicators: u64,
}

/// Ids of campaigns the user has already been shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeenCampaigns {
    ids: BTreeSet<String>,
}

impl SeenCampaigns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the id was not already marked.
    pub fn mark_seen(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }

    /// Forgets an id so the campaign is shown again.
    pub fn forget(&mut self, id: &str) -> bool {
        self.ids.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SeenCampaigns {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        SeenCampaigns {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Campaigns not yet in the seen set, in their original order.
pub fn unseen<'a>(campaigns: &'a [Campaign], seen: &SeenCampaigns) -> Vec<&'a Campaign> {
    campaigns.iter().filter(|c| !seen.contains(&c.id)).collect()
}

#[cfg(test)]
#[path = "campaign_tests.rs"]
mod tests;
