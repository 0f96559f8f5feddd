//! HTML pages rendered with maud.

/// Login, registration and landing pages
pub mod auth;
/// Campground index, detail and form pages
pub mod campgrounds;
/// Shared page chrome
pub mod layout;

pub use layout::Page;
