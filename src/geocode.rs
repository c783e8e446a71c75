use crate::circuit_breaker::{create_geocode_circuit_breaker, GeocodeCircuitBreaker};
use crate::config::Config;
use crate::errors::AppError;
use failsafe::futures::CircuitBreaker as _;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// A resolved coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    results: Option<Vec<GeocodeResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    latitude: f64,
    longitude: f64,
}

/// Client for the external name → coordinates geocoding capability.
///
/// Best-effort by contract: every call is time-bounded, wrapped in a
/// circuit breaker, and callers on the region-resolution path substitute
/// null coordinates for any error instead of failing.
#[derive(Clone)]
pub struct GeocodeClient {
    client: reqwest::Client,
    base_url: String,
    breaker: Arc<GeocodeCircuitBreaker>,
}

impl GeocodeClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.geocode_timeout_ms))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create geocode client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.geocode_base_url.clone(),
            breaker: Arc::new(create_geocode_circuit_breaker()),
        })
    }

    /// Looks up coordinates for a region name.
    ///
    /// Returns `Ok(None)` when the service answers but knows no such
    /// place; `Err` on transport failure, timeout, non-success status, or
    /// an open circuit.
    pub async fn lookup(&self, name: &str) -> Result<Option<Coordinates>, AppError> {
        match self.breaker.call(self.fetch(name)).await {
            Ok(coords) => Ok(coords),
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => Err(AppError::ExternalApiError(
                "geocoding circuit breaker open".to_string(),
            )),
        }
    }

    async fn fetch(&self, name: &str) -> Result<Option<Coordinates>, AppError> {
        // Build URL with proper parameter encoding
        let url = reqwest::Url::parse_with_params(
            &format!("{}/v1/search", self.base_url),
            &[("name", name), ("count", "1")],
        )
        .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))?;

        tracing::debug!("Geocoding region name: {}", name);

        let response = self.client.get(url).send().await.map_err(|e| {
            AppError::ExternalApiError(format!("Geocoding request failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!("Geocoding API returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApiError(format!(
                "Geocoding API returned status {}: {}",
                status, error_text
            )));
        }

        let result: GeocodeResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse geocoding response: {}", e))
        })?;

        let coords = result
            .results
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|r| Coordinates {
                latitude: r.latitude,
                longitude: r.longitude,
            });

        if coords.is_none() {
            tracing::debug!("Geocoding returned no match for '{}'", name);
        }

        Ok(coords)
    }
}
