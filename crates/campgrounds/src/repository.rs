use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::pagination::{PageRequest, search_pattern};
use crate::types::*;

/// Which listings an index query covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingFilter {
    name_pattern: Option<String>,
}

impl ListingFilter {
    /// Every listing.
    pub fn all() -> Self {
        Self::default()
    }

    /// Listings whose name contains `query`, ignoring case. The query is escaped
    /// so it matches as literal text.
    pub fn name_contains(query: &str) -> Self {
        Self {
            name_pattern: Some(search_pattern(query)),
        }
    }

    /// The escaped pattern, if the filter narrows by name.
    pub fn name_pattern(&self) -> Option<&str> {
        self.name_pattern.as_deref()
    }
}

/// One page of listings plus the size of the whole filtered set.
#[derive(Debug, Clone)]
pub struct ListingPage {
    /// Listings on this page, newest first
    pub items: Vec<Listing>,
    /// Number of listings matching the filter, across all pages
    pub total_count: u64,
}

/// Persistence for listing records.
#[async_trait]
pub trait ListingRepository: Send + Sync {
    /// A page of listings matching `filter`, newest first.
    async fn list(
        &self,
        filter: &ListingFilter,
        page: PageRequest,
    ) -> Result<ListingPage, CampgroundError>;

    /// A listing with its comments resolved.
    async fn get(&self, id: Uuid) -> Result<Option<Listing>, CampgroundError>;

    /// Inserts a fully formed listing.
    async fn create(&self, listing: NewListing) -> Result<Listing, CampgroundError>;

    /// Replaces the mutable fields of a listing.
    async fn update(&self, id: Uuid, changes: ListingChanges) -> Result<Listing, CampgroundError>;

    /// Removes a listing and its comments.
    async fn delete(&self, id: Uuid) -> Result<(), CampgroundError>;
}

/// Listing repository backed by PostgreSQL
pub struct PgListingRepository {
    pool: PgPool,
}

const LISTING_COLUMNS: &str = r#"
    id, name, description, image_url, image_deletion_handle,
    raw_location, formatted_address, latitude, longitude,
    author_id, author_username, created_at
"#;

#[derive(sqlx::FromRow)]
struct CampgroundRow {
    id: Uuid,
    name: String,
    description: String,
    image_url: Option<String>,
    image_deletion_handle: Option<String>,
    raw_location: String,
    formatted_address: String,
    latitude: f64,
    longitude: f64,
    author_id: Uuid,
    author_username: String,
    created_at: DateTime<Utc>,
}

impl CampgroundRow {
    fn into_listing(self, comments: Vec<Comment>) -> Listing {
        let image = match (self.image_url, self.image_deletion_handle) {
            (Some(url), Some(deletion_handle)) => Some(ListingImage {
                url,
                deletion_handle,
            }),
            _ => None,
        };

        Listing {
            id: self.id,
            name: self.name,
            description: self.description,
            image,
            location: Location {
                raw_address: self.raw_location,
                formatted_address: self.formatted_address,
                latitude: self.latitude,
                longitude: self.longitude,
            },
            author: Author {
                principal_id: self.author_id,
                display_name: self.author_username,
            },
            comments,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    text: String,
    author_id: Uuid,
    author_username: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            text: row.text,
            author: Author {
                principal_id: row.author_id,
                display_name: row.author_username,
            },
            created_at: row.created_at,
        }
    }
}

impl PgListingRepository {
    /// Creates a new repository over the provided connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn comments_for(&self, campground_id: Uuid) -> Result<Vec<Comment>, CampgroundError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, text, author_id, author_username, created_at
            FROM comments
            WHERE campground_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(campground_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }
}

#[async_trait]
impl ListingRepository for PgListingRepository {
    async fn list(
        &self,
        filter: &ListingFilter,
        page: PageRequest,
    ) -> Result<ListingPage, CampgroundError> {
        let pattern = filter.name_pattern();

        let rows = sqlx::query_as::<_, CampgroundRow>(&format!(
            r#"
            SELECT {LISTING_COLUMNS}
            FROM campgrounds
            WHERE ($1::text IS NULL OR name ~* $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(pattern)
        .bind(page.limit() as i64)
        .bind(page.skip() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM campgrounds WHERE ($1::text IS NULL OR name ~* $1)",
        )
        .bind(pattern)
        .fetch_one(&self.pool)
        .await?;

        Ok(ListingPage {
            items: rows
                .into_iter()
                .map(|row| row.into_listing(Vec::new()))
                .collect(),
            total_count: total_count.max(0) as u64,
        })
    }

    async fn get(&self, id: Uuid) -> Result<Option<Listing>, CampgroundError> {
        let row = sqlx::query_as::<_, CampgroundRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM campgrounds WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let comments = self.comments_for(id).await?;
                Ok(Some(row.into_listing(comments)))
            }
            None => Ok(None),
        }
    }

    async fn create(&self, listing: NewListing) -> Result<Listing, CampgroundError> {
        let row = sqlx::query_as::<_, CampgroundRow>(&format!(
            r#"
            INSERT INTO campgrounds (
                name, description, image_url, image_deletion_handle,
                raw_location, formatted_address, latitude, longitude,
                author_id, author_username
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {LISTING_COLUMNS}
            "#
        ))
        .bind(listing.name.trim())
        .bind(&listing.description)
        .bind(&listing.image.url)
        .bind(&listing.image.deletion_handle)
        .bind(&listing.location.raw_address)
        .bind(&listing.location.formatted_address)
        .bind(listing.location.latitude)
        .bind(listing.location.longitude)
        .bind(listing.author.principal_id)
        .bind(&listing.author.display_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_listing(Vec::new()))
    }

    async fn update(&self, id: Uuid, changes: ListingChanges) -> Result<Listing, CampgroundError> {
        let image_url = changes.image.as_ref().map(|i| i.url.as_str());
        let image_deletion_handle = changes.image.as_ref().map(|i| i.deletion_handle.as_str());

        let row = sqlx::query_as::<_, CampgroundRow>(&format!(
            r#"
            UPDATE campgrounds
            SET name = $1,
                description = $2,
                image_url = $3,
                image_deletion_handle = $4,
                raw_location = $5,
                formatted_address = $6,
                latitude = $7,
                longitude = $8
            WHERE id = $9
            RETURNING {LISTING_COLUMNS}
            "#
        ))
        .bind(changes.name.trim())
        .bind(&changes.description)
        .bind(image_url)
        .bind(image_deletion_handle)
        .bind(&changes.location.raw_address)
        .bind(&changes.location.formatted_address)
        .bind(changes.location.latitude)
        .bind(changes.location.longitude)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CampgroundError::NotFound)?;

        let comments = self.comments_for(id).await?;
        Ok(row.into_listing(comments))
    }

    async fn delete(&self, id: Uuid) -> Result<(), CampgroundError> {
        let result = sqlx::query("DELETE FROM campgrounds WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CampgroundError::NotFound);
        }

        Ok(())
    }
}
