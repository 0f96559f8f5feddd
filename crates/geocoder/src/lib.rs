//! # Geocoder
//!
//! This crate turns a free-text address into coordinates and a normalized,
//! formatted address. The [`Geocoder`] trait is the seam the listing
//! workflows depend on; [`GoogleGeocoder`] talks to the Google Geocoding API.

/// Client for the Google Geocoding API.
mod google;
pub use google::*;

use async_trait::async_trait;
use serde::Serialize;

/// A successfully geocoded address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodedAddress {
    /// Normalized address as returned by the provider
    pub formatted_address: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

/// Reasons a geocode lookup produced no usable result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeocodeError {
    /// The address could not be matched to any location
    #[error("No results for the given address")]
    ZeroResults,

    /// The request was malformed, typically an empty address
    #[error("Invalid geocoding request")]
    InvalidRequest,

    /// The provider refused the request (bad or missing key)
    #[error("Geocoding request denied")]
    RequestDenied,

    /// The API key ran out of quota
    #[error("Geocoding quota exceeded")]
    QuotaExceeded,

    /// Transport failure or an unexpected provider status
    #[error("Unknown geocoding error")]
    Unknown,
}

/// Translates a raw address into a [`GeocodedAddress`].
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Looks up `raw_address`. No partial result is ever returned.
    async fn geocode(&self, raw_address: &str) -> Result<GeocodedAddress, GeocodeError>;
}
