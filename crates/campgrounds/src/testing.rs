//! In-memory collaborators for exercising the listing workflows without
//! Postgres or network access.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use auth_services::types::Principal;
use chrono::{DateTime, Utc};
use geocoder::{GeocodeError, GeocodedAddress, Geocoder};
use image_store::{ImageStore, ImageStoreError, UploadedImage};
use regex::RegexBuilder;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::pagination::PageRequest;
use crate::repository::{ListingFilter, ListingPage, ListingRepository};
use crate::types::*;

/// A listing owned by `owner`, created now.
pub fn sample_listing(name: &str, owner: &Principal) -> Listing {
    sample_listing_at(name, owner, Utc::now())
}

/// A listing owned by `owner` with an explicit creation time.
pub fn sample_listing_at(name: &str, owner: &Principal, created_at: DateTime<Utc>) -> Listing {
    let handle = format!("seed-{}", Uuid::new_v4());
    Listing {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: format!("{} is a lovely place to camp", name),
        image: Some(ListingImage {
            url: format!("https://images.test/{}", handle),
            deletion_handle: handle,
        }),
        location: Location {
            raw_address: "Yosemite".to_string(),
            formatted_address: "Yosemite Valley, CA, USA".to_string(),
            latitude: 37.7456,
            longitude: -119.5936,
        },
        author: Author {
            principal_id: owner.id,
            display_name: owner.username.clone(),
        },
        comments: Vec::new(),
        created_at,
    }
}

/// Listing repository holding records in memory
#[derive(Default)]
pub struct InMemoryListingRepository {
    listings: RwLock<Vec<Listing>>,
    fail_create: AtomicBool,
    missing_on_delete: AtomicBool,
}

impl InMemoryListingRepository {
    /// An empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a listing as-is
    pub async fn insert(&self, listing: Listing) {
        self.listings.write().await.push(listing);
    }

    /// Current state of a listing, bypassing the trait
    pub async fn snapshot(&self, id: Uuid) -> Option<Listing> {
        self.listings.read().await.iter().find(|l| l.id == id).cloned()
    }

    /// Number of stored listings
    pub async fn len(&self) -> usize {
        self.listings.read().await.len()
    }

    /// Makes subsequent creates fail as a database error would
    pub fn fail_creates(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    /// Makes subsequent deletes report the record as already gone
    pub fn lose_records_on_delete(&self) {
        self.missing_on_delete.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ListingRepository for InMemoryListingRepository {
    async fn list(
        &self,
        filter: &ListingFilter,
        page: PageRequest,
    ) -> Result<ListingPage, CampgroundError> {
        let matcher = match filter.name_pattern() {
            Some(pattern) => Some(
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| sqlx::Error::Protocol(e.to_string()))?,
            ),
            None => None,
        };

        let listings = self.listings.read().await;
        let mut matched: Vec<&Listing> = listings
            .iter()
            .rev()
            .filter(|l| matcher.as_ref().is_none_or(|m| m.is_match(&l.name)))
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total_count = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(page.skip() as usize)
            .take(page.limit() as usize)
            .map(|l| Listing {
                comments: Vec::new(),
                ..l.clone()
            })
            .collect();

        Ok(ListingPage { items, total_count })
    }

    async fn get(&self, id: Uuid) -> Result<Option<Listing>, CampgroundError> {
        Ok(self.snapshot(id).await)
    }

    async fn create(&self, listing: NewListing) -> Result<Listing, CampgroundError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut.into());
        }

        let created = Listing {
            id: Uuid::new_v4(),
            name: listing.name.trim().to_string(),
            description: listing.description,
            image: Some(listing.image),
            location: listing.location,
            author: listing.author,
            comments: Vec::new(),
            created_at: Utc::now(),
        };
        self.listings.write().await.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: Uuid, changes: ListingChanges) -> Result<Listing, CampgroundError> {
        let mut listings = self.listings.write().await;
        let listing = listings
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(CampgroundError::NotFound)?;

        listing.name = changes.name.trim().to_string();
        listing.description = changes.description;
        listing.location = changes.location;
        listing.image = changes.image;

        Ok(listing.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), CampgroundError> {
        let mut listings = self.listings.write().await;
        if self.missing_on_delete.load(Ordering::SeqCst) {
            listings.retain(|l| l.id != id);
            return Err(CampgroundError::NotFound);
        }

        let index = listings
            .iter()
            .position(|l| l.id == id)
            .ok_or(CampgroundError::NotFound)?;
        listings.remove(index);
        Ok(())
    }
}

/// Geocoder returning a fixed answer and counting calls
pub struct StubGeocoder {
    result: Result<GeocodedAddress, GeocodeError>,
    calls: AtomicUsize,
}

impl StubGeocoder {
    /// Resolves every address to the given point
    pub fn resolving(formatted_address: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            result: Ok(GeocodedAddress {
                formatted_address: formatted_address.to_string(),
                latitude,
                longitude,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails every lookup with `error`
    pub fn failing(error: GeocodeError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of lookups made
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn geocode(&self, _raw_address: &str) -> Result<GeocodedAddress, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Image store recording every call, with switchable failures
#[derive(Default)]
pub struct RecordingImageStore {
    fail_upload: AtomicBool,
    fail_delete: AtomicBool,
    uploads: Mutex<Vec<PathBuf>>,
    deletes: Mutex<Vec<String>>,
    counter: AtomicUsize,
}

impl RecordingImageStore {
    /// A store where every call succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent uploads fail
    pub fn fail_uploads(&self) {
        self.fail_upload.store(true, Ordering::SeqCst);
    }

    /// Makes subsequent deletes fail
    pub fn fail_deletes(&self) {
        self.fail_delete.store(true, Ordering::SeqCst);
    }

    /// Paths passed to `upload`, including failed attempts
    pub fn uploads(&self) -> Vec<PathBuf> {
        self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
    }

    /// Handles passed to `delete`, including failed attempts
    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ImageStore for RecordingImageStore {
    async fn upload(&self, local_path: &Path) -> Result<UploadedImage, ImageStoreError> {
        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push(local_path.to_path_buf());
        }
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(ImageStoreError::Upload("upload rejected".to_string()));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(UploadedImage {
            url: format!("https://images.test/img-{}", n),
            deletion_handle: format!("img-{}", n),
        })
    }

    async fn delete(&self, deletion_handle: &str) -> Result<(), ImageStoreError> {
        if let Ok(mut deletes) = self.deletes.lock() {
            deletes.push(deletion_handle.to_string());
        }
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(ImageStoreError::Delete("destroy rejected".to_string()));
        }
        Ok(())
    }
}
