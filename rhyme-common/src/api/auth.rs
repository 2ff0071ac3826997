//! Bearer-token identity verification for administrative endpoints
//!
//! # Architecture
//!
//! - Callers present `Authorization: Bearer <token>`
//! - An [`IdentityVerifier`] decides whether the token belongs to an admin
//! - [`StaticTokenVerifier`] keeps only SHA-256 digests of configured tokens
//!   and compares digests, never raw tokens
//!
//! An external identity provider can be plugged in by implementing
//! [`IdentityVerifier`]; the service only depends on the trait.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

// ========================================
// Error Types
// ========================================

/// Authentication error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiAuthError {
    /// Authorization header absent
    #[error("Missing Authorization header")]
    MissingHeader,

    /// Header present but not `Bearer <token>`
    #[error("Malformed Authorization header")]
    MalformedHeader,

    /// Token not recognized as an admin credential
    #[error("Token rejected")]
    Rejected,

    /// Identity provider could not be consulted
    #[error("Identity provider error: {0}")]
    Provider(String),
}

// ========================================
// Header Parsing
// ========================================

/// Extract the token from an `Authorization` header value
///
/// # Examples
///
/// ```
/// use rhyme_common::api::auth::{extract_bearer_token, ApiAuthError};
///
/// assert_eq!(extract_bearer_token(Some("Bearer abc")), Ok("abc"));
/// assert_eq!(extract_bearer_token(None), Err(ApiAuthError::MissingHeader));
/// assert_eq!(extract_bearer_token(Some("Basic abc")), Err(ApiAuthError::MalformedHeader));
/// ```
pub fn extract_bearer_token(header: Option<&str>) -> Result<&str, ApiAuthError> {
    let header = header.ok_or(ApiAuthError::MissingHeader)?;
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(ApiAuthError::MalformedHeader)?;

    if token.is_empty() {
        return Err(ApiAuthError::MalformedHeader);
    }

    Ok(token)
}

/// SHA-256 of a token as 64 hex characters
pub fn calculate_token_hash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ========================================
// Verification
// ========================================

/// Identity established for an accepted token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    /// Short, non-secret label for logs (hash prefix)
    pub label: String,
}

/// Decides whether a bearer token grants administrative access
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AdminIdentity, ApiAuthError>;
}

/// Verifier backed by a fixed set of admin tokens
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    token_hashes: Vec<String>,
}

impl StaticTokenVerifier {
    /// Build from raw tokens; blank entries are ignored
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let token_hashes = tokens
            .into_iter()
            .filter(|t| !t.as_ref().trim().is_empty())
            .map(|t| calculate_token_hash(t.as_ref().trim()))
            .collect();
        Self { token_hashes }
    }

    pub fn is_empty(&self) -> bool {
        self.token_hashes.is_empty()
    }
}

#[async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<AdminIdentity, ApiAuthError> {
        let presented = calculate_token_hash(token);
        if self.token_hashes.iter().any(|known| *known == presented) {
            Ok(AdminIdentity {
                label: presented[..8].to_string(),
            })
        } else {
            Err(ApiAuthError::Rejected)
        }
    }
}
