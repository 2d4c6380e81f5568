//! Error types for credential handling.
//!
//! `AuthError` is what callers of the session layer see. `TokenError`
//! describes low-level JWT and JWKS failures; it always surfaces to callers
//! as `AuthError::InvalidToken`.

use thiserror::Error;

/// Authentication failures visible to the session layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The identity provider reported an error, or validation rejected the
    /// assertion it returned.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// A claim needed to build the session context is absent.
    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    /// Refresh was requested but no refresh token was ever issued.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// The identity provider declined the refresh token.
    #[error("Token refresh rejected: {0}")]
    RefreshRejected(String),
}

impl AuthError {
    /// Check if this error came from the refresh path.
    #[must_use]
    pub fn is_refresh_error(&self) -> bool {
        matches!(self, AuthError::NoRefreshToken | AuthError::RefreshRejected(_))
    }

    /// Name of the missing claim, if this is a `MissingClaim` error.
    #[must_use]
    pub fn missing_claim(&self) -> Option<&str> {
        match self {
            AuthError::MissingClaim(name) => Some(name),
            _ => None,
        }
    }
}

/// JWT / JWKS level failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Token has expired (exp claim is in the past).
    #[error("Token has expired")]
    Expired,

    /// Token signature is invalid.
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Token format is malformed.
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// Token uses an unsupported algorithm (only RS256 is accepted).
    #[error("Unsupported algorithm: only RS256 is allowed")]
    InvalidAlgorithm,

    /// Issuer or audience did not match.
    #[error("Token rejected: {0}")]
    Rejected(String),

    /// Failed to fetch the key set.
    #[error("JWKS fetch failed: {0}")]
    JwksFetchFailed(String),

    /// Key with the token's kid is not in the key set.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// RSA key material is invalid.
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        AuthError::InvalidToken(e.to_string())
    }
}
