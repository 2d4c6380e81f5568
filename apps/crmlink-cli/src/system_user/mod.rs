//! System-user sign-in
//!
//! A partner application authenticates as the tenant's system user by
//! signing `{SystemUserToken}.{yyyyMMddHHmm}` with its RSA key and
//! exchanging it for a JWT carrying the tenant claims. The JWT is then
//! checked against the tenant's key set.

use crate::api::log_exchange;
use crate::config::SystemUserSettings;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crmlink_auth::{
    sign_rs256, AuthError, Credential, IdentityClaims, JwksClient, ValidationConfig,
};
use crmlink_session::CredentialAcquirer;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Token type requested from the exchange endpoint.
pub const RETURN_TOKEN_TYPE: &str = "JWT";

/// Timestamp format appended to the system-user token before signing.
const SIGNATURE_TIME_FORMAT: &str = "%Y%m%d%H%M";

/// Exchange and key set URLs for a tenant environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemUserEndpoints {
    pub authenticate_url: String,
    pub jwks_url: String,
}

impl SystemUserEndpoints {
    /// Endpoints of `https://{sub_domain}.superoffice.com`.
    pub fn for_sub_domain(sub_domain: &str) -> Self {
        Self::for_base_url(&format!("https://{sub_domain}.superoffice.com"))
    }

    pub fn for_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            authenticate_url: format!("{base}/login/api/PartnerSystemUser/Authenticate"),
            jwks_url: format!("{base}/login/.well-known/jwks"),
        }
    }
}

/// Body of the exchange request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SystemUserRequest {
    pub signed_system_token: String,
    pub application_token: String,
    pub context_identifier: String,
    pub return_token_type: String,
}

/// Body of the exchange response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SystemUserResponse {
    pub is_successful: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Sign the system-user token for the given instant.
///
/// Returns `{token}.{yyyyMMddHHmm}.{base64 signature}`.
///
/// # Errors
///
/// `AuthError::InvalidToken` when the private key cannot be used.
pub fn signed_system_token(
    system_user_token: &str,
    private_key_pem: &str,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    let message = format!(
        "{system_user_token}.{}",
        now.format(SIGNATURE_TIME_FORMAT)
    );
    let signature = sign_rs256(message.as_bytes(), private_key_pem.as_bytes())?;
    Ok(format!("{message}.{signature}"))
}

/// Credential acquirer for the system-user exchange.
///
/// System-user credentials carry no refresh token.
pub struct SystemUserAcquirer {
    http: Client,
    settings: SystemUserSettings,
    endpoints: SystemUserEndpoints,
    jwks: JwksClient,
}

impl SystemUserAcquirer {
    pub fn new(http: Client, settings: SystemUserSettings) -> Self {
        let endpoints = SystemUserEndpoints::for_sub_domain(&settings.sub_domain);
        Self::with_endpoints(http, settings, endpoints)
    }

    pub fn with_endpoints(
        http: Client,
        settings: SystemUserSettings,
        endpoints: SystemUserEndpoints,
    ) -> Self {
        let jwks = JwksClient::with_client(endpoints.jwks_url.clone(), http.clone());
        Self {
            http,
            settings,
            endpoints,
            jwks,
        }
    }

    pub fn settings(&self) -> &SystemUserSettings {
        &self.settings
    }

    pub fn endpoints(&self) -> &SystemUserEndpoints {
        &self.endpoints
    }

    async fn exchange(&self, request: &SystemUserRequest) -> Result<String, AuthError> {
        let url = &self.endpoints.authenticate_url;
        let response = self
            .http
            .post(url)
            .header(ACCEPT, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| AuthError::InvalidToken(format!("System user exchange failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AuthError::InvalidToken(format!("System user response unreadable: {e}"))
        })?;
        log_exchange("POST", url, status, &body);

        if !status.is_success() {
            return Err(AuthError::InvalidToken(format!(
                "System user exchange returned HTTP {}",
                status.as_u16()
            )));
        }

        let result: SystemUserResponse = serde_json::from_str(&body).map_err(|e| {
            AuthError::InvalidToken(format!("Invalid system user response: {e}"))
        })?;
        if !result.is_successful {
            return Err(AuthError::InvalidToken(
                result
                    .error_message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "System user exchange was not successful".to_string()),
            ));
        }
        result
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::InvalidToken("System user response has no token".to_string()))
    }
}

#[async_trait]
impl CredentialAcquirer for SystemUserAcquirer {
    fn name(&self) -> &str {
        "system-user"
    }

    async fn acquire(&self) -> Result<Credential, AuthError> {
        let signed = signed_system_token(
            &self.settings.system_user_token,
            &self.settings.private_key_pem,
            Utc::now(),
        )?;
        let request = SystemUserRequest {
            signed_system_token: signed,
            application_token: self.settings.client_secret.clone(),
            context_identifier: self.settings.context_identifier.clone(),
            return_token_type: RETURN_TOKEN_TYPE.to_string(),
        };

        info!(
            context_identifier = %self.settings.context_identifier,
            "Exchanging system user token"
        );
        let token = self.exchange(&request).await?;

        // Expiry and claims are filled in from the validated token.
        Ok(Credential::new(
            token,
            None,
            IdentityClaims::new(),
            Utc::now() + chrono::Duration::minutes(1),
        ))
    }

    async fn validate(&self, credential: Credential) -> Result<Credential, AuthError> {
        let payload = self
            .jwks
            .validate(&credential.access_token, &ValidationConfig::default())
            .await?;

        let expires_at = payload
            .get("exp")
            .and_then(serde_json::Value::as_i64)
            .and_then(|exp| DateTime::from_timestamp(exp, 0))
            .unwrap_or(credential.expires_at);
        let claims = IdentityClaims::from_json(&payload);
        debug!(claims = claims.len(), %expires_at, "System user token validated");

        Ok(Credential {
            claims,
            expires_at,
            ..credential
        })
    }

    async fn refresh(&self, _current: &Credential) -> Result<Credential, AuthError> {
        Err(AuthError::NoRefreshToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const PRIVATE_KEY: &str = include_str!("../../tests/fixtures/system_user_key.pem");

    #[test]
    fn test_endpoints_for_sub_domain() {
        let endpoints = SystemUserEndpoints::for_sub_domain("sod");
        assert_eq!(
            endpoints.authenticate_url,
            "https://sod.superoffice.com/login/api/PartnerSystemUser/Authenticate"
        );
        assert_eq!(
            endpoints.jwks_url,
            "https://sod.superoffice.com/login/.well-known/jwks"
        );
    }

    #[test]
    fn test_signed_token_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 59).unwrap();
        let signed = signed_system_token("SysToken-abc", PRIVATE_KEY, now).unwrap();

        let mut parts = signed.splitn(3, '.');
        assert_eq!(parts.next(), Some("SysToken-abc"));
        assert_eq!(parts.next(), Some("202403070905"));
        let signature = parts.next().unwrap();
        assert!(!signature.is_empty());
        assert!(!signature.contains('-') && !signature.contains('_'));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let now = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 0).unwrap();
        assert_eq!(
            signed_system_token("t", PRIVATE_KEY, now).unwrap(),
            signed_system_token("t", PRIVATE_KEY, now).unwrap()
        );
    }

    #[test]
    fn test_bad_key_rejected() {
        let err = signed_system_token("t", "not a key", Utc::now()).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn test_request_serializes_pascal_case() {
        let request = SystemUserRequest {
            signed_system_token: "s".to_string(),
            application_token: "a".to_string(),
            context_identifier: "Cust1".to_string(),
            return_token_type: RETURN_TOKEN_TYPE.to_string(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "SignedSystemToken": "s",
                "ApplicationToken": "a",
                "ContextIdentifier": "Cust1",
                "ReturnTokenType": "JWT"
            })
        );
    }

    #[test]
    fn test_response_failure_parses() {
        let response: SystemUserResponse =
            serde_json::from_str(r#"{"IsSuccessful":false,"ErrorMessage":"Unknown token"}"#)
                .unwrap();
        assert!(!response.is_successful);
        assert_eq!(response.error_message.as_deref(), Some("Unknown token"));
        assert!(response.token.is_none());
    }
}
