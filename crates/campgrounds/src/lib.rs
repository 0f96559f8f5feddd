//! # Campgrounds
//!
//! Listing, search and ownership-gated editing of campground listings.
//! The [`ListingService`] runs each workflow as a strictly sequential pipeline
//! over the geocoder, the image store and the [`ListingRepository`], stopping
//! at the first failure.

/// Per-request principal and flash messages
mod context;
pub use context::*;

/// Authorization checks for listing mutations
pub mod guard;

/// Page numbers, page counts and search pattern escaping
pub mod pagination;

/// Listing persistence
mod repository;
pub use repository::*;

/// Create, update, delete and list workflows
mod service;
pub use service::*;

/// Listing model and error types
mod types;
pub use types::*;

/// In-memory collaborators for tests
#[cfg(any(test, feature = "testing"))]
pub mod testing;
