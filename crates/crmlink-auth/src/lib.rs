//! Credential handling for crmlink.
//!
//! This crate provides:
//! - The `Credential` model (tokens, identity claims, expiry)
//! - The identity claim names the CRM platform embeds in its tokens
//! - RS256 JWT validation and message signing
//! - JWKS fetching with caching for key rotation
//!
//! # Example
//!
//! ```rust,ignore
//! use crmlink_auth::{JwksClient, ValidationConfig, IdentityClaims};
//!
//! let jwks = JwksClient::new("https://sod.superoffice.com/login/.well-known/jwks")?;
//! let payload = jwks.validate(&id_token, &ValidationConfig::default()).await?;
//! let claims = IdentityClaims::from_json(&payload);
//! ```

mod claims;
mod credential;
mod error;
mod jwks;
mod jwt;
mod token;

pub use claims::{
    IdentityClaims, CONTEXT_IDENTIFIER_CLAIM, NETSERVER_URL_CLAIM, REQUIRED_CLAIMS, TICKET_CLAIM,
    WEBAPI_URL_CLAIM,
};
pub use credential::{Credential, DEFAULT_TOKEN_LIFETIME_SECS};
pub use error::{AuthError, TokenError};
pub use jwks::{Jwk, JwkSet, JwksClient};
pub use jwt::{decode_claims, extract_kid, sign_rs256, ValidationConfig};
pub use token::{OAuthError, TokenResponse};
