//! Who may do what to a listing.

use auth_services::types::Principal;

use crate::types::{CampgroundError, Listing};

/// Fails with `Unauthenticated` unless a principal is present.
pub fn require_authenticated(principal: Option<&Principal>) -> Result<&Principal, CampgroundError> {
    principal.ok_or(CampgroundError::Unauthenticated)
}

/// Fails with `Forbidden` unless `principal` authored `listing`.
pub fn require_ownership(principal: &Principal, listing: &Listing) -> Result<(), CampgroundError> {
    if listing.author.principal_id != principal.id {
        return Err(CampgroundError::Forbidden);
    }
    Ok(())
}
