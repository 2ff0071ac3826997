//! # Rhyme Common Library
//!
//! Shared code for the rhyme analysis service including:
//! - Error type and result alias
//! - TOML configuration loading and defaults
//! - Content fingerprinting for result caching
//! - API error envelope and bearer-token identity verification

pub mod api;
pub mod config;
pub mod error;
pub mod fingerprint;

pub use error::{Error, Result};
pub use fingerprint::fingerprint;
