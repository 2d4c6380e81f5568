//! Token endpoint wire models

use serde::{Deserialize, Serialize};

/// Response from a token endpoint (code exchange or refresh)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token
    pub access_token: String,

    /// Token type (normally "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Seconds until the access token expires
    #[serde(default)]
    pub expires_in: Option<u64>,

    /// Refresh token for obtaining new access tokens
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// OIDC identity token
    #[serde(default)]
    pub id_token: Option<String>,

    /// Granted scopes
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// OAuth error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthError {
    /// Error code
    pub error: String,

    /// Human-readable error description
    pub error_description: Option<String>,
}

impl OAuthError {
    /// Best human-readable message for this error
    pub fn message(&self) -> String {
        match &self.error_description {
            Some(desc) if !desc.is_empty() => format!("{}: {}", self.error, desc),
            _ => self.error.clone(),
        }
    }
}
