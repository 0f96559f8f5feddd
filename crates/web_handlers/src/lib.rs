//! # Web Handlers for YelpCamp
//!
//! HTML pages and form endpoints for browsing, creating, editing and
//! deleting campgrounds, plus the account pages that establish who the
//! current principal is.

/// Register, login, logout and landing handlers
mod auth_handlers;
pub use auth_handlers::*;

/// Campground index, detail and mutation handlers
mod campground_handlers;
pub use campground_handlers::*;

/// Flash messages carried across redirects
pub mod flash;

/// Page and redirect responses
pub mod responses;

/// Route table and method override guard
pub mod routes;
pub use routes::configure;

/// Multipart listing forms
pub mod upload;

/// maud page templates
pub mod views;
