//! # EPIC Common Library
//!
//! Shared code for the EPIC survey backend:
//! - Database initialization and domain models
//! - API authentication helpers (passwords, tokens)
//! - Configuration loading
//! - Timestamp utilities

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
