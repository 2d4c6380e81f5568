//! Credential model

use crate::claims::IdentityClaims;
use crate::token::TokenResponse;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// An authenticated identity assertion: tokens plus identity claims.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    /// Access token (bearer for REST, ticket source for proxies)
    pub access_token: String,

    /// Refresh token, when the provider issued one
    pub refresh_token: Option<String>,

    /// OIDC identity token, when the flow produced one
    pub id_token: Option<String>,

    /// Identity claims
    pub claims: IdentityClaims,

    /// Access token expiration time
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Create a credential with explicit values
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        claims: IdentityClaims,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            id_token: None,
            claims,
            expires_at,
        }
    }

    /// Create a credential from a token endpoint response
    pub fn from_token_response(response: TokenResponse, claims: IdentityClaims) -> Self {
        let lifetime = response
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);

        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            id_token: response.id_token,
            claims,
            expires_at: Utc::now() + Duration::seconds(lifetime),
        }
    }

    /// Refresh token, ignoring empty values
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }

    /// Check if the access token is expired
    pub fn is_expired(&self) -> bool {
        self.expires_within(Duration::zero())
    }

    /// Check if the access token expires within the given window
    pub fn expires_within(&self, window: Duration) -> bool {
        self.expires_at <= Utc::now() + window
    }

    /// Context identifier claim, if present
    pub fn context_identifier(&self) -> Option<&str> {
        self.claims.context_identifier()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .field("claims", &self.claims.len())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
