use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{GeocodeError, GeocodedAddress, Geocoder};

const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Client for the Google Geocoding API
pub struct GoogleGeocoder {
    client: Client,
    base_url: String,
    api_key: String,
}

/// Top-level geocoding response
#[derive(Debug, Deserialize)]
pub struct GoogleGeocodeResponse {
    /// Provider status code, e.g. `OK` or `ZERO_RESULTS`
    pub status: String,
    /// Matches, best first
    #[serde(default)]
    pub results: Vec<GoogleGeocodeResult>,
    /// Human readable detail accompanying error statuses
    pub error_message: Option<String>,
}

/// One candidate match
#[derive(Debug, Deserialize)]
pub struct GoogleGeocodeResult {
    /// Normalized address
    pub formatted_address: String,
    /// Coordinates of the match
    pub geometry: GoogleGeometry,
}

/// Geometry block of a match
#[derive(Debug, Deserialize)]
pub struct GoogleGeometry {
    /// The point location
    pub location: GoogleLatLng,
}

/// A latitude/longitude pair
#[derive(Debug, Deserialize)]
pub struct GoogleLatLng {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
}

impl GoogleGeocoder {
    /// Create a new geocoding client authenticated with `api_key`
    pub fn new(api_key: String) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| {
                warn!("Failed to create HTTP client: {}", e);
                GeocodeError::Unknown
            })?;

        Ok(Self {
            client,
            base_url: GOOGLE_GEOCODE_URL.to_string(),
            api_key,
        })
    }

    /// Points the client at a different endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Maps a decoded provider response onto the geocoding contract.
pub fn interpret_response(response: GoogleGeocodeResponse) -> Result<GeocodedAddress, GeocodeError> {
    match response.status.as_str() {
        "OK" => {
            let first = response
                .results
                .into_iter()
                .next()
                .ok_or(GeocodeError::ZeroResults)?;
            Ok(GeocodedAddress {
                formatted_address: first.formatted_address,
                latitude: first.geometry.location.lat,
                longitude: first.geometry.location.lng,
            })
        }
        "ZERO_RESULTS" => Err(GeocodeError::ZeroResults),
        "INVALID_REQUEST" => Err(GeocodeError::InvalidRequest),
        "REQUEST_DENIED" => Err(GeocodeError::RequestDenied),
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => Err(GeocodeError::QuotaExceeded),
        other => {
            warn!(
                "Unexpected geocoding status {}: {}",
                other,
                response.error_message.as_deref().unwrap_or("")
            );
            Err(GeocodeError::Unknown)
        }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, raw_address: &str) -> Result<GeocodedAddress, GeocodeError> {
        if raw_address.trim().is_empty() {
            return Err(GeocodeError::InvalidRequest);
        }

        debug!("Geocoding address: {}", raw_address);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("address", raw_address), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                warn!("Geocoding request failed: {}", e);
                GeocodeError::Unknown
            })?;

        if !response.status().is_success() {
            warn!("Geocoding HTTP {}", response.status());
            return Err(GeocodeError::Unknown);
        }

        let body: GoogleGeocodeResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse geocoding response: {}", e);
            GeocodeError::Unknown
        })?;

        interpret_response(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GoogleGeocodeResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn ok_status_takes_first_result() {
        let response = parse(
            r#"{
                "status": "OK",
                "results": [
                    {
                        "formatted_address": "Yosemite Valley, CA 95389, USA",
                        "geometry": { "location": { "lat": 37.7456, "lng": -119.5936 } }
                    },
                    {
                        "formatted_address": "Somewhere else",
                        "geometry": { "location": { "lat": 1.0, "lng": 2.0 } }
                    }
                ]
            }"#,
        );

        let address = interpret_response(response).unwrap();
        assert_eq!(address.formatted_address, "Yosemite Valley, CA 95389, USA");
        assert_eq!(address.latitude, 37.7456);
        assert_eq!(address.longitude, -119.5936);
    }

    #[test]
    fn provider_statuses_map_to_errors() {
        let cases = [
            ("ZERO_RESULTS", GeocodeError::ZeroResults),
            ("INVALID_REQUEST", GeocodeError::InvalidRequest),
            ("REQUEST_DENIED", GeocodeError::RequestDenied),
            ("OVER_QUERY_LIMIT", GeocodeError::QuotaExceeded),
            ("OVER_DAILY_LIMIT", GeocodeError::QuotaExceeded),
            ("UNKNOWN_ERROR", GeocodeError::Unknown),
            ("ERROR", GeocodeError::Unknown),
        ];

        for (status, expected) in cases {
            let response = parse(&format!(r#"{{"status": "{}", "results": []}}"#, status));
            assert_eq!(interpret_response(response), Err(expected), "status {}", status);
        }
    }

    #[test]
    fn ok_without_results_counts_as_zero_results() {
        let response = parse(r#"{"status": "OK", "results": []}"#);
        assert_eq!(interpret_response(response), Err(GeocodeError::ZeroResults));
    }

    #[tokio::test]
    async fn blank_address_is_rejected_without_a_request() {
        let geocoder = GoogleGeocoder::new("key".to_string())
            .unwrap()
            .with_base_url("http://127.0.0.1:9");

        assert_eq!(
            geocoder.geocode("   ").await,
            Err(GeocodeError::InvalidRequest)
        );
    }
}
