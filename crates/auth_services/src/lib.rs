//! # Auth Services
//!
//! This crate provides authentication services for the application.
//! It includes the principal model, password-based registration and login,
//! JWT token handling, and the middleware that resolves the current principal
//! for each request.

/// JWT token handling for signed-in principals.
pub mod jwt;
/// Middleware for request authentication and the current-principal extractor.
pub mod middleware;
/// Service definitions for user management and authentication operations.
pub mod service;
/// Types and structures used in authentication services.
pub mod types;
