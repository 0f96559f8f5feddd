use std::path::PathBuf;

use chrono::{DateTime, Utc};
use geocoder::{GeocodeError, GeocodedAddress};
use image_store::UploadedImage;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

lazy_static! {
    static ref IMAGE_EXTENSION: Regex =
        Regex::new(r"(?i)\.(jpg|jpeg|png|gif)$").expect("image extension pattern is valid");
}

/// A campground listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    /// Unique identifier, assigned at creation
    pub id: Uuid,
    /// Display name, searchable
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Hosted photo; url and deletion handle always travel together
    pub image: Option<ListingImage>,
    /// Geocoded location
    pub location: Location,
    /// Who created the listing
    pub author: Author,
    /// Comments, oldest first. Only resolved when a single listing is loaded.
    pub comments: Vec<Comment>,
    /// Creation time, the sort key of the index
    pub created_at: DateTime<Utc>,
}

/// A hosted listing image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingImage {
    /// Public URL of the image
    pub url: String,
    /// Handle needed to delete the hosted image
    pub deletion_handle: String,
}

impl From<UploadedImage> for ListingImage {
    fn from(image: UploadedImage) -> Self {
        Self {
            url: image.url,
            deletion_handle: image.deletion_handle,
        }
    }
}

/// Where a campground is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Address as typed by the author
    pub raw_address: String,
    /// Address as normalized by the geocoder
    pub formatted_address: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Location {
    /// Combines the typed address with its geocoding result.
    pub fn geocoded(raw_address: &str, geocoded: GeocodedAddress) -> Self {
        Self {
            raw_address: raw_address.to_string(),
            formatted_address: geocoded.formatted_address,
            latitude: geocoded.latitude,
            longitude: geocoded.longitude,
        }
    }
}

/// Author snapshot taken when a listing or comment is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Id of the user account
    pub principal_id: Uuid,
    /// Username at creation time
    pub display_name: String,
}

/// A comment on a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    /// Comment id
    pub id: Uuid,
    /// Comment body
    pub text: String,
    /// Who wrote it
    pub author: Author,
    /// When it was posted
    pub created_at: DateTime<Utc>,
}

/// Fully formed record handed to the repository on creation
#[derive(Debug, Clone, PartialEq)]
pub struct NewListing {
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Uploaded image
    pub image: ListingImage,
    /// Geocoded location
    pub location: Location,
    /// Acting principal
    pub author: Author,
}

/// Replacement values for the mutable fields of a listing
#[derive(Debug, Clone, PartialEq)]
pub struct ListingChanges {
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Geocoded location
    pub location: Location,
    /// Image after the update
    pub image: Option<ListingImage>,
}

impl ListingChanges {
    /// The listing's current values, unchanged.
    pub fn from_listing(listing: &Listing) -> Self {
        Self {
            name: listing.name.clone(),
            description: listing.description.clone(),
            location: listing.location.clone(),
            image: listing.image.clone(),
        }
    }
}

/// Text fields of the create/edit form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingForm {
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Raw address to geocode
    pub location: String,
}

/// A file received with the form and stored locally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// File name as sent by the browser
    pub original_name: String,
    /// Where the bytes were written
    pub path: PathBuf,
}

impl UploadedFile {
    /// Whether the original name carries an allowed image extension.
    pub fn is_allowed_image(&self) -> bool {
        is_allowed_image(&self.original_name)
    }
}

/// Case-insensitive check for `.jpg`, `.jpeg`, `.png` or `.gif`.
pub fn is_allowed_image(file_name: &str) -> bool {
    IMAGE_EXTENSION.is_match(file_name)
}

/// Errors produced by the listing workflows
#[derive(thiserror::Error, Debug)]
pub enum CampgroundError {
    /// No principal on a route that needs one
    #[error("You need to be logged in to do that")]
    Unauthenticated,

    /// Principal is not the listing's author
    #[error("You don't have permission to do that")]
    Forbidden,

    /// Listing id does not resolve
    #[error("Campground not found")]
    NotFound,

    /// Uploaded file is not an allowed image type
    #[error("Only image files are allowed")]
    InvalidFile,

    /// No image was uploaded
    #[error("Please choose an image to upload")]
    MissingFile,

    /// Geocoder found no match
    #[error("Invalid address, try typing a new address")]
    GeocodeZeroResults,

    /// Geocoder rejected the request as malformed
    #[error("Invalid address, try typing a new address")]
    GeocodeInvalidRequest,

    /// Geocoder refused the request
    #[error("Something Is Wrong Your Request Was Denied")]
    GeocodeRequestDenied,

    /// Geocoder quota is used up
    #[error("All Requests Used Up")]
    GeocodeQuotaExceeded,

    /// Any other geocoding failure
    #[error("Error")]
    GeocodeUnknown,

    /// Image upload failed
    #[error("{0}")]
    UploadFailed(String),

    /// Removing the hosted image failed
    #[error("{0}")]
    ImageDeleteFailed(String),

    /// Database error
    #[error("Database error: {0}")]
    PersistenceFailed(#[from] sqlx::Error),
}

impl CampgroundError {
    /// Flash text for this error.
    pub fn user_message(&self) -> String {
        match self {
            CampgroundError::PersistenceFailed(_) => {
                "Something went wrong, please try again".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<GeocodeError> for CampgroundError {
    fn from(error: GeocodeError) -> Self {
        match error {
            GeocodeError::ZeroResults => CampgroundError::GeocodeZeroResults,
            GeocodeError::InvalidRequest => CampgroundError::GeocodeInvalidRequest,
            GeocodeError::RequestDenied => CampgroundError::GeocodeRequestDenied,
            GeocodeError::QuotaExceeded => CampgroundError::GeocodeQuotaExceeded,
            GeocodeError::Unknown => CampgroundError::GeocodeUnknown,
        }
    }
}
