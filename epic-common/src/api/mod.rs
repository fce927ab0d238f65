//! API module for shared HTTP API functionality
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Database operations (via sqlx)
//! - Shared types
//!
//! The server crate wraps these with Axum extractors and middleware.

pub mod auth;
pub mod types;

pub use auth::{
    generate_salt, generate_token_key, hash_password, parse_authorization_header,
    verify_password, ApiAuthError,
};
pub use types::{ErrorBody, ErrorResponse, MessageResponse, TokenRequest, TokenResponse};
