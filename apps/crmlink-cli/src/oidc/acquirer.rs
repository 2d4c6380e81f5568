//! Interactive sign-in: authorization code + PKCE over a loopback redirect

use super::browser::{BrowserLauncher, SystemBrowser};
use super::discovery::{discover, ProviderMetadata};
use super::loopback::LoopbackListener;
use super::pkce::{generate_state, PkceChallenge};
use crate::api::log_exchange;
use crate::config::InteractiveSettings;
use async_trait::async_trait;
use crmlink_auth::{
    AuthError, Credential, IdentityClaims, JwksClient, OAuthError, TokenResponse, ValidationConfig,
};
use crmlink_session::CredentialAcquirer;
use reqwest::Client;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Scope requested on sign-in.
pub const DEFAULT_SCOPE: &str = "openid profile";

/// How long to wait for the browser to come back.
pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 300;

/// Parameters of the interactive flow
#[derive(Clone)]
pub struct OidcOptions {
    pub authority: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    pub login_timeout: Duration,
}

impl OidcOptions {
    pub fn new(
        authority: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            authority: authority.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: DEFAULT_SCOPE.to_string(),
            login_timeout: Duration::from_secs(DEFAULT_LOGIN_TIMEOUT_SECS),
        }
    }

    pub fn from_settings(settings: &InteractiveSettings) -> Self {
        Self::new(
            settings.authority.clone(),
            settings.client_id.clone(),
            settings.client_secret.clone(),
        )
    }

    #[must_use]
    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }
}

impl std::fmt::Debug for OidcOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcOptions")
            .field("authority", &self.authority)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scope", &self.scope)
            .field("login_timeout", &self.login_timeout)
            .finish()
    }
}

/// Build the authorization request URL.
///
/// # Errors
///
/// `AuthError::InvalidToken` when the discovered endpoint is not a URL.
pub fn authorization_url(
    metadata: &ProviderMetadata,
    options: &OidcOptions,
    redirect_uri: &str,
    state: &str,
    pkce: &PkceChallenge,
) -> Result<String, AuthError> {
    let mut url = url::Url::parse(&metadata.authorization_endpoint)
        .map_err(|e| AuthError::InvalidToken(format!("Invalid authorization endpoint: {e}")))?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &options.client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", &options.scope)
        .append_pair("state", state)
        .append_pair("code_challenge", &pkce.challenge)
        .append_pair("code_challenge_method", pkce.method());
    Ok(url.into())
}

/// OIDC credential acquirer.
///
/// Provider metadata and the key set client are resolved once and reused
/// for validation and refresh.
pub struct OidcAcquirer {
    http: Client,
    options: OidcOptions,
    browser: Box<dyn BrowserLauncher>,
    metadata: OnceCell<ProviderMetadata>,
    jwks: OnceCell<JwksClient>,
}

impl OidcAcquirer {
    pub fn new(http: Client, options: OidcOptions) -> Self {
        Self {
            http,
            options,
            browser: Box::new(SystemBrowser),
            metadata: OnceCell::new(),
            jwks: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn with_browser(mut self, browser: impl BrowserLauncher + 'static) -> Self {
        self.browser = Box::new(browser);
        self
    }

    pub fn options(&self) -> &OidcOptions {
        &self.options
    }

    async fn metadata(&self) -> Result<&ProviderMetadata, AuthError> {
        self.metadata
            .get_or_try_init(|| discover(&self.http, &self.options.authority))
            .await
    }

    async fn jwks(&self, metadata: &ProviderMetadata) -> &JwksClient {
        self.jwks
            .get_or_init(|| async {
                JwksClient::with_client(metadata.jwks_uri.clone(), self.http.clone())
            })
            .await
    }

    /// POST a form to the token endpoint. Errors carry the provider's message.
    async fn token_request(
        &self,
        endpoint: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, String> {
        let response = self
            .http
            .post(endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| format!("Token request failed: {e}"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Token response unreadable: {e}"))?;
        log_exchange("POST", endpoint, status, &body);

        if !status.is_success() {
            return Err(match serde_json::from_str::<OAuthError>(&body) {
                Ok(error) => error.message(),
                Err(_) => format!("HTTP {}", status.as_u16()),
            });
        }

        serde_json::from_str(&body).map_err(|e| format!("Invalid token response: {e}"))
    }
}

#[async_trait]
impl CredentialAcquirer for OidcAcquirer {
    fn name(&self) -> &str {
        "oidc"
    }

    async fn acquire(&self) -> Result<Credential, AuthError> {
        let metadata = self.metadata().await?;
        let listener = LoopbackListener::bind().await?;
        let redirect_uri = listener.redirect_uri().to_string();
        let pkce = PkceChallenge::generate();
        let state = generate_state();

        let url = authorization_url(metadata, &self.options, &redirect_uri, &state, &pkce)?;
        info!(redirect_uri = %redirect_uri, "Starting browser sign-in");
        self.browser.launch(&url).await;

        let code = listener
            .wait_for_code(&state, self.options.login_timeout)
            .await?;
        debug!("Authorization code received");

        let response = self
            .token_request(
                &metadata.token_endpoint,
                &[
                    ("grant_type", "authorization_code"),
                    ("code", &code),
                    ("client_id", &self.options.client_id),
                    ("client_secret", &self.options.client_secret),
                    ("redirect_uri", &redirect_uri),
                    ("code_verifier", &pkce.verifier),
                ],
            )
            .await
            .map_err(AuthError::InvalidToken)?;

        Ok(Credential::from_token_response(
            response,
            IdentityClaims::new(),
        ))
    }

    async fn validate(&self, credential: Credential) -> Result<Credential, AuthError> {
        if credential.is_expired() {
            return Err(AuthError::InvalidToken(
                "Access token has already expired".to_string(),
            ));
        }

        let Some(id_token) = credential.id_token.as_deref() else {
            if credential.claims.is_empty() {
                return Err(AuthError::InvalidToken(
                    "Token response carried no identity token".to_string(),
                ));
            }
            return Ok(credential);
        };

        let metadata = self.metadata().await?;
        let config = ValidationConfig::default()
            .issuer(metadata.issuer.clone())
            .audience(vec![self.options.client_id.clone()]);
        let payload = self.jwks(metadata).await.validate(id_token, &config).await?;
        let claims = IdentityClaims::from_json(&payload);
        debug!(claims = claims.len(), "Identity token validated");

        Ok(Credential { claims, ..credential })
    }

    async fn refresh(&self, current: &Credential) -> Result<Credential, AuthError> {
        let refresh_token = current.refresh_token().ok_or(AuthError::NoRefreshToken)?;
        let metadata = self.metadata().await?;

        let response = self
            .token_request(
                &metadata.token_endpoint,
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                    ("client_id", &self.options.client_id),
                    ("client_secret", &self.options.client_secret),
                ],
            )
            .await
            .map_err(AuthError::RefreshRejected)?;

        let mut refreshed = Credential::from_token_response(response, current.claims.clone());
        if refreshed.refresh_token().is_none() {
            refreshed.refresh_token = Some(refresh_token.to_string());
        }
        Ok(refreshed)
    }
}
