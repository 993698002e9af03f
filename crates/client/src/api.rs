// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP backend.
//!
//! The reporter and the real-time channel reach the backend through the
//! [`TelemetrySink`] and [`ResyncSource`] traits; [`HttpBackend`] implements
//! both with `reqwest`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use fieldsync_core::{CampaignList, TelemetryPayload};
use serde_json::Value;

use crate::context::AuthContext;

/// Boxed future returned by the backend traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of a failed backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Network failure or a status worth retrying (408, 429, 5xx).
    #[error("transient failure: {0}")]
    Transient(String),

    /// The backend rejected the request; retrying will not help.
    #[error("rejected with status {status}: {body}")]
    Permanent { status: u16, body: String },

    /// No token is available yet.
    #[error("not authenticated")]
    Unauthenticated,
}

impl DeliveryError {
    /// Whether the request should be kept for a later attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DeliveryError::Permanent { .. })
    }
}

/// Maps a non-success HTTP status to a delivery error.
pub fn classify_status(status: u16, body: String) -> DeliveryError {
    match status {
        408 | 429 | 500..=599 => DeliveryError::Transient(format!("status {}: {}", status, body)),
        _ => DeliveryError::Permanent { status, body },
    }
}

/// Where telemetry goes.
pub trait TelemetrySink: Send + Sync {
    fn deliver<'a>(&'a self, payload: &'a TelemetryPayload) -> BoxFuture<'a, Result<(), DeliveryError>>;

    /// Tells the backend this device stopped reporting.
    fn mark_offline(&self) -> BoxFuture<'_, Result<(), DeliveryError>>;
}

/// Server-pushed collections refetched after a reconnect.
pub trait ResyncSource: Send + Sync {
    fn fetch_campaigns(&self) -> BoxFuture<'_, Result<CampaignList, DeliveryError>>;
}

/// `reqwest` client for the mobile API.
pub struct HttpBackend {
    api_url: String,
    auth: Arc<dyn AuthContext>,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(api_url: impl Into<String>, auth: Arc<dyn AuthContext>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            auth,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn token(&self) -> Result<String, DeliveryError> {
        self.auth
            .current_token()
            .ok_or(DeliveryError::Unauthenticated)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, DeliveryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status.as_u16(), body))
    }

    /// Registers a push subscription for this user.
    pub async fn register_push_subscription(&self, subscription: &Value) -> Result<(), DeliveryError> {
        let token = self.token()?;
        let response = self
            .client
            .post(self.url("/api/mobile/push-subscription"))
            .bearer_auth(token)
            .json(&serde_json::json!({ "subscription": subscription }))
            .send()
            .await
            .map_err(network_error)?;
        Self::check(response).await?;
        tracing::info!("push subscription registered");
        Ok(())
    }
}

fn network_error(e: reqwest::Error) -> DeliveryError {
    DeliveryError::Transient(e.to_string())
}

impl TelemetrySink for HttpBackend {
    fn deliver<'a>(&'a self, payload: &'a TelemetryPayload) -> BoxFuture<'a, Result<(), DeliveryError>> {
        Box::pin(async move {
            let token = self.token()?;
            let response = self
                .client
                .post(self.url("/api/mobile/location"))
                .bearer_auth(token)
                .json(payload)
                .send()
                .await
                .map_err(network_error)?;
            Self::check(response).await?;
            Ok(())
        })
    }

    fn mark_offline(&self) -> BoxFuture<'_, Result<(), DeliveryError>> {
        Box::pin(async move {
            let token = self.token()?;
            let response = self
                .client
                .put(self.url("/api/mobile/location/offline"))
                .bearer_auth(token)
                .send()
                .await
                .map_err(network_error)?;
            Self::check(response).await?;
            Ok(())
        })
    }
}

impl ResyncSource for HttpBackend {
    fn fetch_campaigns(&self) -> BoxFuture<'_, Result<CampaignList, DeliveryError>> {
        Box::pin(async move {
            let token = self.token()?;
            let response = self
                .client
                .get(self.url("/api/mobile/campaigns"))
                .bearer_auth(token)
                .send()
                .await
                .map_err(network_error)?;
            let response = Self::check(response).await?;
            response
                .json::<CampaignList>()
                .await
                .map_err(|e| DeliveryError::Transient(format!("invalid campaign list: {}", e)))
        })
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
