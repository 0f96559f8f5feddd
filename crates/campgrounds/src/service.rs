use std::sync::Arc;

use auth_services::types::Principal;
use geocoder::{GeocodedAddress, Geocoder};
use image_store::ImageStore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::guard::{require_authenticated, require_ownership};
use crate::pagination::{PER_PAGE, PageRequest, parse_page, total_pages};
use crate::repository::{ListingFilter, ListingRepository};
use crate::types::*;

/// Shown when a search matches nothing.
pub const NO_MATCH_MESSAGE: &str = "No such campground found, please try again";

/// Query string of the campground index
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    /// Name search text
    pub search: Option<String>,
    /// Requested page, kept raw so junk falls back to page 1
    pub page: Option<String>,
}

/// Data for rendering one index page
#[derive(Debug, Clone, Serialize)]
pub struct ListingIndex {
    /// Listings on this page, newest first
    pub listings: Vec<Listing>,
    /// Page being shown
    pub current_page: u32,
    /// Pages in the filtered set
    pub total_pages: u32,
    /// Active search text, if any
    pub search: Option<String>,
    /// Set when a search matched nothing
    pub no_match: Option<String>,
}

/// Orchestrates the listing workflows over the guard, geocoder, image store
/// and repository. Steps run strictly in order and the first failure ends
/// the workflow; nothing is retried.
#[derive(Clone)]
pub struct ListingService {
    repository: Arc<dyn ListingRepository>,
    geocoder: Arc<dyn Geocoder>,
    images: Arc<dyn ImageStore>,
}

impl ListingService {
    /// Creates a new service over its collaborators
    pub fn new(
        repository: Arc<dyn ListingRepository>,
        geocoder: Arc<dyn Geocoder>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            repository,
            geocoder,
            images,
        }
    }

    /// One page of the index, optionally narrowed by a name search.
    pub async fn list(&self, query: &ListQuery) -> Result<ListingIndex, CampgroundError> {
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let page = PageRequest::new(parse_page(query.page.as_deref()), PER_PAGE);

        let filter = match &search {
            Some(text) => ListingFilter::name_contains(text),
            None => ListingFilter::all(),
        };

        let result = self.repository.list(&filter, page).await?;

        let no_match = if search.is_some() && result.items.is_empty() {
            Some(NO_MATCH_MESSAGE.to_string())
        } else {
            None
        };

        Ok(ListingIndex {
            listings: result.items,
            current_page: page.number,
            total_pages: total_pages(result.total_count, page.size),
            search,
            no_match,
        })
    }

    /// A single listing with its comments.
    pub async fn show(&self, id: Uuid) -> Result<Listing, CampgroundError> {
        self.repository.get(id).await?.ok_or(CampgroundError::NotFound)
    }

    /// Checks that the new-listing form may be shown.
    pub fn new_form(&self, ctx: &RequestContext) -> Result<(), CampgroundError> {
        require_authenticated(ctx.principal.as_ref())?;
        Ok(())
    }

    /// The listing to prefill the edit form, for its owner only.
    pub async fn edit_form(&self, ctx: &RequestContext, id: Uuid) -> Result<Listing, CampgroundError> {
        let (_, listing) = self.load_owned(ctx.principal.as_ref(), id).await?;
        Ok(listing)
    }

    /// Creates a listing and returns its id.
    ///
    /// The address is geocoded before the image is uploaded so a bad address
    /// never leaves an orphaned upload behind.
    pub async fn create(
        &self,
        ctx: &mut RequestContext,
        form: ListingForm,
        image: Option<&UploadedFile>,
    ) -> Result<Uuid, CampgroundError> {
        let principal = require_authenticated(ctx.principal.as_ref())?.clone();
        let file = validate_image(image)?.ok_or(CampgroundError::MissingFile)?;

        let geocoded = self.geocode(&form.location).await?;

        let uploaded = self.images.upload(&file.path).await.map_err(|e| {
            log::warn!("⚠️ Image upload failed for {}: {}", principal.id, e);
            CampgroundError::UploadFailed(e.to_string())
        })?;
        let image = ListingImage::from(uploaded);

        let new_listing = NewListing {
            name: form.name,
            description: form.description,
            image: image.clone(),
            location: Location::geocoded(&form.location, geocoded),
            author: Author {
                principal_id: principal.id,
                display_name: principal.username.clone(),
            },
        };

        let listing = match self.repository.create(new_listing).await {
            Ok(listing) => listing,
            Err(e) => {
                log::error!("❌ Failed to save campground: {}", e);
                if let Err(cleanup) = self.images.delete(&image.deletion_handle).await {
                    log::warn!(
                        "⚠️ Could not remove orphaned image {}: {}",
                        image.deletion_handle,
                        cleanup
                    );
                }
                return Err(e);
            }
        };

        log::info!("🏕️ Campground {} created by {}", listing.id, principal.id);
        ctx.flash.success("Campground created");

        Ok(listing.id)
    }

    /// Updates an owned listing, optionally replacing its image.
    ///
    /// The old image is deleted before the new one is uploaded. If that delete
    /// fails nothing changes. If the delete succeeds and the upload then fails,
    /// the listing keeps its other fields but loses its image reference.
    pub async fn update(
        &self,
        ctx: &mut RequestContext,
        id: Uuid,
        form: ListingForm,
        image: Option<&UploadedFile>,
    ) -> Result<Listing, CampgroundError> {
        let (principal, listing) = self.load_owned(ctx.principal.as_ref(), id).await?;
        let file = validate_image(image)?;

        let geocoded = self.geocode(&form.location).await?;

        let image = match file {
            Some(file) => Some(self.replace_image(&listing, file).await?),
            None => listing.image.clone(),
        };

        let changes = ListingChanges {
            name: form.name,
            description: form.description,
            location: Location::geocoded(&form.location, geocoded),
            image,
        };

        let updated = self.repository.update(id, changes).await?;

        log::info!("✏️ Campground {} updated by {}", id, principal.id);
        ctx.flash.success("Successfully Updated!");

        Ok(updated)
    }

    /// Deletes an owned listing after removing its hosted image.
    ///
    /// When the image cannot be removed the record is kept, so its deletion
    /// handle is not lost.
    pub async fn delete(&self, ctx: &mut RequestContext, id: Uuid) -> Result<(), CampgroundError> {
        let (principal, listing) = self.load_owned(ctx.principal.as_ref(), id).await?;

        if let Some(image) = &listing.image {
            self.images.delete(&image.deletion_handle).await.map_err(|e| {
                log::warn!("⚠️ Keeping campground {}: image delete failed: {}", id, e);
                CampgroundError::ImageDeleteFailed(e.to_string())
            })?;
        }

        match self.repository.delete(id).await {
            Ok(()) => {}
            Err(CampgroundError::NotFound) => {
                log::info!("Campground {} was already gone", id);
            }
            Err(e) => return Err(e),
        }

        log::info!("🗑️ Campground {} deleted by {}", id, principal.id);
        ctx.flash.success("Campground deleted");

        Ok(())
    }

    async fn load_owned(
        &self,
        principal: Option<&Principal>,
        id: Uuid,
    ) -> Result<(Principal, Listing), CampgroundError> {
        let principal = require_authenticated(principal)?;
        let listing = self.show(id).await?;
        require_ownership(principal, &listing)?;
        Ok((principal.clone(), listing))
    }

    async fn geocode(&self, raw_address: &str) -> Result<GeocodedAddress, CampgroundError> {
        self.geocoder.geocode(raw_address).await.map_err(|e| {
            log::warn!("⚠️ Geocoding {:?} failed: {}", raw_address, e);
            CampgroundError::from(e)
        })
    }

    async fn replace_image(
        &self,
        listing: &Listing,
        file: &UploadedFile,
    ) -> Result<ListingImage, CampgroundError> {
        if let Some(old) = &listing.image {
            self.images.delete(&old.deletion_handle).await.map_err(|e| {
                log::warn!("⚠️ Old image of {} could not be deleted: {}", listing.id, e);
                CampgroundError::ImageDeleteFailed(e.to_string())
            })?;
        }

        match self.images.upload(&file.path).await {
            Ok(uploaded) => Ok(ListingImage::from(uploaded)),
            Err(e) => {
                log::warn!("⚠️ Replacement image for {} failed: {}", listing.id, e);
                if listing.image.is_some() {
                    let cleared = ListingChanges {
                        image: None,
                        ..ListingChanges::from_listing(listing)
                    };
                    if let Err(persist) = self.repository.update(listing.id, cleared).await {
                        log::error!(
                            "❌ Could not clear stale image of {}: {}",
                            listing.id,
                            persist
                        );
                    }
                }
                Err(CampgroundError::UploadFailed(e.to_string()))
            }
        }
    }
}

/// Rejects files without an allowed image extension.
fn validate_image(image: Option<&UploadedFile>) -> Result<Option<&UploadedFile>, CampgroundError> {
    match image {
        Some(file) if !file.is_allowed_image() => Err(CampgroundError::InvalidFile),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use chrono::{Duration, Utc};
    use geocoder::GeocodeError;
    use std::path::PathBuf;

    struct Harness {
        repository: Arc<InMemoryListingRepository>,
        geocoder: Arc<StubGeocoder>,
        images: Arc<RecordingImageStore>,
        service: ListingService,
    }

    fn harness_with(geocoder: StubGeocoder) -> Harness {
        let repository = Arc::new(InMemoryListingRepository::new());
        let geocoder = Arc::new(geocoder);
        let images = Arc::new(RecordingImageStore::new());
        let service = ListingService::new(repository.clone(), geocoder.clone(), images.clone());
        Harness {
            repository,
            geocoder,
            images,
            service,
        }
    }

    fn harness() -> Harness {
        harness_with(StubGeocoder::resolving("Yosemite Valley, CA 95389, USA", 37.7456, -119.5936))
    }

    fn principal(name: &str) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            username: name.to_string(),
        }
    }

    fn form(name: &str) -> ListingForm {
        ListingForm {
            name: name.to_string(),
            description: "Quiet sites by the river".to_string(),
            location: "Yosemite".to_string(),
        }
    }

    fn file(name: &str) -> UploadedFile {
        UploadedFile {
            original_name: name.to_string(),
            path: PathBuf::from(format!("/tmp/{}", name)),
        }
    }

    #[tokio::test]
    async fn create_persists_geocoded_listing_with_uploaded_image() {
        let h = harness();
        let owner = principal("ranger");
        let mut ctx = RequestContext::new(Some(owner.clone()));

        let id = h
            .service
            .create(&mut ctx, form("Rocky Hill"), Some(&file("tent.jpg")))
            .await
            .unwrap();

        let listing = h.repository.snapshot(id).await.unwrap();
        assert_eq!(
            listing.image,
            Some(ListingImage {
                url: "https://images.test/img-1".to_string(),
                deletion_handle: "img-1".to_string(),
            })
        );
        assert_eq!(listing.location.raw_address, "Yosemite");
        assert_eq!(listing.location.formatted_address, "Yosemite Valley, CA 95389, USA");
        assert_eq!(listing.author.principal_id, owner.id);
        assert_eq!(listing.author.display_name, "ranger");
        assert_eq!(h.images.uploads(), vec![PathBuf::from("/tmp/tent.jpg")]);
        assert_eq!(ctx.flash.success, vec!["Campground created"]);
    }

    #[tokio::test]
    async fn unauthenticated_create_makes_no_external_calls() {
        let h = harness();
        let mut ctx = RequestContext::new(None);

        let result = h
            .service
            .create(&mut ctx, form("Rocky Hill"), Some(&file("tent.jpg")))
            .await;

        assert!(matches!(result, Err(CampgroundError::Unauthenticated)));
        assert_eq!(h.geocoder.calls(), 0);
        assert!(h.images.uploads().is_empty());
        assert_eq!(h.repository.len().await, 0);
    }

    #[tokio::test]
    async fn create_rejects_missing_and_disallowed_files_before_geocoding() {
        let h = harness();
        let mut ctx = RequestContext::new(Some(principal("ranger")));

        let missing = h.service.create(&mut ctx, form("Rocky Hill"), None).await;
        assert!(matches!(missing, Err(CampgroundError::MissingFile)));

        let invalid = h
            .service
            .create(&mut ctx, form("Rocky Hill"), Some(&file("notes.txt")))
            .await;
        assert!(matches!(invalid, Err(CampgroundError::InvalidFile)));

        assert_eq!(h.geocoder.calls(), 0);
        assert!(h.images.uploads().is_empty());
    }

    #[tokio::test]
    async fn failed_geocode_skips_upload_and_persists_nothing() {
        let h = harness_with(StubGeocoder::failing(GeocodeError::ZeroResults));
        let mut ctx = RequestContext::new(Some(principal("ranger")));

        let result = h
            .service
            .create(&mut ctx, form("Rocky Hill"), Some(&file("tent.jpg")))
            .await;

        assert!(matches!(result, Err(CampgroundError::GeocodeZeroResults)));
        assert!(h.images.uploads().is_empty());
        assert_eq!(h.repository.len().await, 0);
        assert!(ctx.flash.is_empty());
    }

    #[tokio::test]
    async fn failed_upload_persists_nothing() {
        let h = harness();
        h.images.fail_uploads();
        let mut ctx = RequestContext::new(Some(principal("ranger")));

        let result = h
            .service
            .create(&mut ctx, form("Rocky Hill"), Some(&file("tent.jpg")))
            .await;

        assert!(matches!(result, Err(CampgroundError::UploadFailed(_))));
        assert_eq!(h.repository.len().await, 0);
    }

    #[tokio::test]
    async fn update_without_file_keeps_image() {
        let h = harness();
        let owner = principal("ranger");
        let listing = sample_listing("Rocky Hill", &owner);
        let before = listing.image.clone();
        h.repository.insert(listing.clone()).await;

        let mut ctx = RequestContext::new(Some(owner));
        let updated = h
            .service
            .update(&mut ctx, listing.id, form("Rocky Hill North"), None)
            .await
            .unwrap();

        assert_eq!(updated.image, before);
        assert_eq!(updated.name, "Rocky Hill North");
        assert_eq!(updated.location.formatted_address, "Yosemite Valley, CA 95389, USA");
        assert!(h.images.deletes().is_empty());
        assert!(h.images.uploads().is_empty());
        assert_eq!(ctx.flash.success, vec!["Successfully Updated!"]);
    }

    #[tokio::test]
    async fn update_with_file_deletes_old_image_then_uploads() {
        let h = harness();
        let owner = principal("ranger");
        let listing = sample_listing("Rocky Hill", &owner);
        let old_handle = listing.image.as_ref().unwrap().deletion_handle.clone();
        h.repository.insert(listing.clone()).await;

        let mut ctx = RequestContext::new(Some(owner));
        let updated = h
            .service
            .update(&mut ctx, listing.id, form("Rocky Hill"), Some(&file("new.png")))
            .await
            .unwrap();

        assert_eq!(h.images.deletes(), vec![old_handle]);
        assert_eq!(updated.image.unwrap().deletion_handle, "img-1");
    }

    #[tokio::test]
    async fn failed_old_image_delete_aborts_update_unchanged() {
        let h = harness();
        h.images.fail_deletes();
        let owner = principal("ranger");
        let listing = sample_listing("Rocky Hill", &owner);
        h.repository.insert(listing.clone()).await;

        let mut ctx = RequestContext::new(Some(owner));
        let result = h
            .service
            .update(&mut ctx, listing.id, form("Renamed"), Some(&file("new.png")))
            .await;

        assert!(matches!(result, Err(CampgroundError::ImageDeleteFailed(_))));
        assert!(h.images.uploads().is_empty());
        assert_eq!(h.repository.snapshot(listing.id).await.unwrap(), listing);
    }

    #[tokio::test]
    async fn failed_replacement_upload_leaves_listing_without_image() {
        let h = harness();
        h.images.fail_uploads();
        let owner = principal("ranger");
        let listing = sample_listing("Rocky Hill", &owner);
        h.repository.insert(listing.clone()).await;

        let mut ctx = RequestContext::new(Some(owner));
        let result = h
            .service
            .update(&mut ctx, listing.id, form("Renamed"), Some(&file("new.png")))
            .await;

        assert!(matches!(result, Err(CampgroundError::UploadFailed(_))));
        let stored = h.repository.snapshot(listing.id).await.unwrap();
        assert_eq!(stored.image, None);
        assert_eq!(stored.name, "Rocky Hill");
    }

    #[tokio::test]
    async fn update_geocode_failure_changes_nothing() {
        let h = harness_with(StubGeocoder::failing(GeocodeError::QuotaExceeded));
        let owner = principal("ranger");
        let listing = sample_listing("Rocky Hill", &owner);
        h.repository.insert(listing.clone()).await;

        let mut ctx = RequestContext::new(Some(owner));
        let result = h
            .service
            .update(&mut ctx, listing.id, form("Renamed"), Some(&file("new.png")))
            .await;

        assert!(matches!(result, Err(CampgroundError::GeocodeQuotaExceeded)));
        assert!(h.images.deletes().is_empty());
        assert_eq!(h.repository.snapshot(listing.id).await.unwrap(), listing);
    }

    #[tokio::test]
    async fn non_owner_is_forbidden_and_listing_unchanged() {
        let h = harness();
        let owner = principal("ranger");
        let listing = sample_listing("Rocky Hill", &owner);
        h.repository.insert(listing.clone()).await;

        let mut ctx = RequestContext::new(Some(principal("intruder")));
        let update = h
            .service
            .update(&mut ctx, listing.id, form("Mine now"), None)
            .await;
        let delete = h.service.delete(&mut ctx, listing.id).await;

        assert!(matches!(update, Err(CampgroundError::Forbidden)));
        assert!(matches!(delete, Err(CampgroundError::Forbidden)));
        assert_eq!(h.geocoder.calls(), 0);
        assert!(h.images.deletes().is_empty());
        assert_eq!(h.repository.snapshot(listing.id).await.unwrap(), listing);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found_rather_than_forbidden() {
        let h = harness();
        let mut ctx = RequestContext::new(Some(principal("ranger")));

        let edit = h.service.edit_form(&ctx, Uuid::new_v4()).await;
        let delete = h.service.delete(&mut ctx, Uuid::new_v4()).await;

        assert!(matches!(edit, Err(CampgroundError::NotFound)));
        assert!(matches!(delete, Err(CampgroundError::NotFound)));
    }

    #[tokio::test]
    async fn delete_removes_image_then_record() {
        let h = harness();
        let owner = principal("ranger");
        let listing = sample_listing("Rocky Hill", &owner);
        let handle = listing.image.as_ref().unwrap().deletion_handle.clone();
        h.repository.insert(listing.clone()).await;

        let mut ctx = RequestContext::new(Some(owner));
        h.service.delete(&mut ctx, listing.id).await.unwrap();

        assert_eq!(h.images.deletes(), vec![handle]);
        assert!(h.repository.snapshot(listing.id).await.is_none());
    }

    #[tokio::test]
    async fn failed_image_delete_keeps_record() {
        let h = harness();
        h.images.fail_deletes();
        let owner = principal("ranger");
        let listing = sample_listing("Rocky Hill", &owner);
        h.repository.insert(listing.clone()).await;

        let mut ctx = RequestContext::new(Some(owner));
        let result = h.service.delete(&mut ctx, listing.id).await;

        assert!(matches!(result, Err(CampgroundError::ImageDeleteFailed(_))));
        assert!(h.repository.snapshot(listing.id).await.is_some());
    }

    #[tokio::test]
    async fn delete_succeeds_when_record_is_already_gone() {
        let h = harness();
        h.repository.lose_records_on_delete();
        let owner = principal("ranger");
        let listing = sample_listing("Rocky Hill", &owner);
        let handle = listing.image.as_ref().unwrap().deletion_handle.clone();
        h.repository.insert(listing.clone()).await;

        let mut ctx = RequestContext::new(Some(owner));
        h.service.delete(&mut ctx, listing.id).await.unwrap();

        assert_eq!(h.images.deletes(), vec![handle]);
        assert_eq!(ctx.flash.success, vec!["Campground deleted"]);
    }

    #[tokio::test]
    async fn failed_create_removes_the_uploaded_image() {
        let h = harness();
        h.repository.fail_creates();
        let mut ctx = RequestContext::new(Some(principal("ranger")));

        let result = h
            .service
            .create(&mut ctx, form("Rocky Hill"), Some(&file("tent.jpg")))
            .await;

        assert!(matches!(result, Err(CampgroundError::PersistenceFailed(_))));
        assert_eq!(h.images.uploads().len(), 1);
        assert_eq!(h.images.deletes(), vec!["img-1".to_string()]);
        assert_eq!(h.repository.len().await, 0);
        assert!(ctx.flash.success.is_empty());
    }

    #[tokio::test]
    async fn index_pages_newest_first() {
        let h = harness();
        let owner = principal("ranger");
        let base = Utc::now();
        for i in 1..=17 {
            h.repository
                .insert(sample_listing_at(
                    &format!("Camp {}", i),
                    &owner,
                    base + Duration::minutes(i),
                ))
                .await;
        }

        let index = h
            .service
            .list(&ListQuery {
                search: None,
                page: Some("2".to_string()),
            })
            .await
            .unwrap();

        let names: Vec<_> = index.listings.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(
            names,
            ["Camp 9", "Camp 8", "Camp 7", "Camp 6", "Camp 5", "Camp 4", "Camp 3", "Camp 2"]
        );
        assert_eq!(index.total_pages, 3);
        assert_eq!(index.current_page, 2);
        assert_eq!(index.no_match, None);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_literal() {
        let h = harness();
        let owner = principal("ranger");
        h.repository.insert(sample_listing("Rocky Hill", &owner)).await;
        h.repository.insert(sample_listing("Canyon Floor", &owner)).await;

        let rocky = h
            .service
            .list(&ListQuery {
                search: Some("rocky".to_string()),
                page: None,
            })
            .await
            .unwrap();
        assert_eq!(rocky.listings.len(), 1);
        assert_eq!(rocky.listings[0].name, "Rocky Hill");
        assert_eq!(rocky.search.as_deref(), Some("rocky"));

        let dotted = h
            .service
            .list(&ListQuery {
                search: Some("x.y".to_string()),
                page: None,
            })
            .await
            .unwrap();
        assert!(dotted.listings.is_empty());
        assert_eq!(dotted.no_match.as_deref(), Some(NO_MATCH_MESSAGE));

        h.repository.insert(sample_listing("Camp x.y", &owner)).await;
        h.repository.insert(sample_listing("Camp xzy", &owner)).await;
        let literal = h
            .service
            .list(&ListQuery {
                search: Some("x.y".to_string()),
                page: None,
            })
            .await
            .unwrap();
        let names: Vec<_> = literal.listings.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Camp x.y"]);
    }

    #[tokio::test]
    async fn empty_index_has_no_no_match_message() {
        let h = harness();
        let index = h
            .service
            .list(&ListQuery {
                search: Some("   ".to_string()),
                page: Some("junk".to_string()),
            })
            .await
            .unwrap();

        assert!(index.listings.is_empty());
        assert_eq!(index.no_match, None);
        assert_eq!(index.search, None);
        assert_eq!(index.current_page, 1);
        assert_eq!(index.total_pages, 0);
    }
}
