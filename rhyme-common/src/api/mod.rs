//! API module for shared HTTP API functionality
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Shared request/response types
//!
//! The service crate wraps these with axum extractors and middleware.

pub mod auth;
pub mod types;

pub use auth::{
    calculate_token_hash, extract_bearer_token, AdminIdentity, ApiAuthError, IdentityVerifier,
    StaticTokenVerifier,
};
pub use types::{ErrorEnvelope, ErrorKind};
