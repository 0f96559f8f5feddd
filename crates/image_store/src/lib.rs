//! # Image Store
//!
//! This crate uploads listing photos to a hosted image service and removes
//! them again by their deletion handle.
//! The request boundary is expected to have checked the file type already;
//! the clients here do not inspect content.

/// Cloudinary implementation of the image store.
pub mod cloudinary;
/// Types shared by image store implementations.
pub mod types;

pub use cloudinary::{CloudinaryConfig, CloudinaryImageStore, MockImageStore};
pub use types::{ImageStore, ImageStoreError, UploadedImage};
