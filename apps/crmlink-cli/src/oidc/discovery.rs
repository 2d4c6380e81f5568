//! OIDC provider metadata discovery

use crmlink_auth::AuthError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Endpoints published at `/.well-known/openid-configuration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
}

/// Well-known configuration URL for an authority.
#[must_use]
pub fn well_known_url(authority: &str) -> String {
    format!(
        "{}/.well-known/openid-configuration",
        authority.trim_end_matches('/')
    )
}

/// Fetch provider metadata for an authority.
///
/// # Errors
///
/// `AuthError::InvalidToken` when the document cannot be fetched or lacks
/// a required endpoint.
#[instrument(skip(http))]
pub async fn discover(http: &Client, authority: &str) -> Result<ProviderMetadata, AuthError> {
    let url = well_known_url(authority);
    let response = http
        .get(&url)
        .send()
        .await
        .map_err(|e| AuthError::InvalidToken(format!("Discovery request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(AuthError::InvalidToken(format!(
            "Discovery failed with HTTP {}",
            response.status().as_u16()
        )));
    }

    let metadata: ProviderMetadata = response
        .json()
        .await
        .map_err(|e| AuthError::InvalidToken(format!("Invalid discovery document: {e}")))?;

    debug!(
        authorization_endpoint = %metadata.authorization_endpoint,
        token_endpoint = %metadata.token_endpoint,
        "Discovered OIDC endpoints"
    );
    Ok(metadata)
}
