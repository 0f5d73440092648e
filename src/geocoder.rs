//! Location Resolution Module
//!
//! Resolves a free-text place name to a [`Location`] through the Open-Meteo
//! geocoding API. The first result wins; there is no disambiguation beyond
//! the ranking the upstream service applies.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::lookup::LookupClient;
use crate::models::Location;

/// Geocoding response from `OpenMeteo`
#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
}

impl From<GeocodingResult> for Location {
    fn from(result: GeocodingResult) -> Self {
        Location::new(result.name, result.latitude, result.longitude)
    }
}

/// Service for resolving place names
#[derive(Debug, Clone)]
pub struct Geocoder {
    client: LookupClient,
    base_url: String,
}

impl Geocoder {
    /// Create a geocoder talking to `base_url`, e.g. `https://geocoding-api.open-meteo.com/v1`
    pub fn new(client: LookupClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn search_url(&self, city: &str) -> String {
        format!(
            "{}/search?name={}&count=1&language=en&format=json",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(city)
        )
    }

    /// Resolve a place name to its best match.
    ///
    /// Returns `None` for blank input (without a network call), for an empty
    /// result list, and for any lookup failure. Callers cannot tell "not
    /// found" from "service down".
    #[instrument(skip(self, deadline))]
    pub async fn resolve(&self, city: &str, deadline: Duration) -> Option<Location> {
        let city = city.trim();
        if city.is_empty() {
            debug!("Blank location name, skipping geocoding");
            return None;
        }

        let response: GeocodingResponse =
            match self.client.fetch_json(&self.search_url(city), deadline).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Geocoding '{}' failed: {}", city, e);
                    return None;
                }
            };

        match response.results.and_then(|results| results.into_iter().next()) {
            Some(result) => {
                info!(
                    "Found location: {} ({:.4}, {:.4})",
                    result.name, result.latitude, result.longitude
                );
                Some(result.into())
            }
            None => {
                warn!("No results found for location '{}'", city);
                None
            }
        }
    }
}
