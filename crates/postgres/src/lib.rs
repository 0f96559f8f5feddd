//! # Postgres
//!
//! This crate provides the connection pool and schema setup for the YelpCamp database.

/// Database client for the YelpCamp application.
pub mod database;
