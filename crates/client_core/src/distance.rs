//! Distance lookup against a distance-matrix API, with a deterministic
//! degraded mode when the provider cannot answer.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{domain::ResolvedDistance, protocol::DistanceMatrixResponse};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum DistanceError {
    #[error("no maps API key configured")]
    MissingApiKey,
    #[error("distance request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("distance provider returned status {status}: {message}")]
    ProviderStatus { status: String, message: String },
    #[error("distance element status was {0}")]
    ElementStatus(String),
    #[error("malformed distance response: {0}")]
    Malformed(&'static str),
}

#[async_trait]
pub trait DistanceProvider: Send + Sync {
    /// Distance between two place names, in kilometres.
    async fn distance_km(&self, origin: &str, destination: &str) -> Result<f64, DistanceError>;
}

pub struct DistanceMatrixClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl DistanceMatrixClient {
    pub fn new(http: Client, endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            api_key,
        }
    }
}

#[async_trait]
impl DistanceProvider for DistanceMatrixClient {
    async fn distance_km(&self, origin: &str, destination: &str) -> Result<f64, DistanceError> {
        let api_key = self.api_key.as_deref().ok_or(DistanceError::MissingApiKey)?;

        let body: DistanceMatrixResponse = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("origins", origin),
                ("destinations", destination),
                ("key", api_key),
            ])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(strip_url)?
            .json()
            .await
            .map_err(strip_url)?;

        distance_from_response(&body)
    }
}

/// The request URL carries the API key in its query string.
fn strip_url(err: reqwest::Error) -> DistanceError {
    DistanceError::Transport(err.without_url())
}

fn distance_from_response(body: &DistanceMatrixResponse) -> Result<f64, DistanceError> {
    if let Some(status) = body.status.as_deref() {
        if status != "OK" {
            return Err(DistanceError::ProviderStatus {
                status: status.to_string(),
                message: body.error_message.clone().unwrap_or_default(),
            });
        }
    }

    let element = body
        .first_element()
        .ok_or(DistanceError::Malformed("missing rows[0].elements[0]"))?;

    match element.status.as_deref() {
        Some("OK") => {}
        Some(other) => return Err(DistanceError::ElementStatus(other.to_string())),
        None => return Err(DistanceError::Malformed("missing element status")),
    }

    let metres = element
        .distance
        .ok_or(DistanceError::Malformed("missing element distance"))?
        .value;
    if !metres.is_finite() || metres < 0.0 {
        return Err(DistanceError::Malformed("distance value out of range"));
    }
    Ok(metres / 1000.0)
}

/// Degraded-mode distances used whenever the provider fails.
///
/// Place names are compared by their leading city token (text before the first
/// comma, trimmed, lowercased).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackDistancePolicy {
    pub same_city_km: f64,
    pub different_city_km: f64,
    pub last_resort_km: f64,
}

impl Default for FallbackDistancePolicy {
    fn default() -> Self {
        Self {
            same_city_km: 5.0,
            different_city_km: 100.0,
            last_resort_km: 50.0,
        }
    }
}

impl FallbackDistancePolicy {
    pub fn estimate_km(&self, origin: &str, destination: &str) -> f64 {
        match (city_token(origin), city_token(destination)) {
            (Some(a), Some(b)) if a == b => self.same_city_km,
            (Some(_), Some(_)) => self.different_city_km,
            _ => self.last_resort_km,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("same_city_km", self.same_city_km),
            ("different_city_km", self.different_city_km),
            ("last_resort_km", self.last_resort_km),
        ] {
            if !value.is_finite() || value < 0.0 {
                anyhow::bail!("{name} must be a non-negative number, got {value}");
            }
        }
        Ok(())
    }
}

pub fn city_token(place: &str) -> Option<String> {
    let token = place.split(',').next().unwrap_or_default().trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_lowercase())
    }
}

/// Provider lookup with the fallback policy behind it. Never fails.
pub struct DistanceResolver<P> {
    provider: P,
    fallback: FallbackDistancePolicy,
}

impl<P: DistanceProvider> DistanceResolver<P> {
    pub fn new(provider: P, fallback: FallbackDistancePolicy) -> Self {
        Self { provider, fallback }
    }

    pub fn fallback(&self) -> &FallbackDistancePolicy {
        &self.fallback
    }

    pub async fn resolve(&self, origin: &str, destination: &str) -> ResolvedDistance {
        match self.provider.distance_km(origin, destination).await {
            Ok(km) => {
                debug!(km, "distance resolved by provider");
                ResolvedDistance::provider(km)
            }
            Err(err) => {
                let km = self.fallback.estimate_km(origin, destination);
                warn!(error = %err, km, "distance lookup failed; using fallback estimate");
                ResolvedDistance::fallback(km)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/distance_tests.rs"]
mod tests;
