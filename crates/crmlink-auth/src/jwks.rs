//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! Identity tokens from the provider are verified against the key set the
//! provider publishes. Keys are cached and re-fetched once when a token
//! references an unknown kid (key rotation).

use crate::error::TokenError;
use crate::jwt::{decode_claims, extract_kid, ValidationConfig};
use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// A JSON Web Key as defined in RFC 7517.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type (e.g., "RSA").
    pub kty: String,

    /// Key ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Public key use (e.g., "sig" for signature).
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// Algorithm (e.g., "RS256").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// RSA modulus (`Base64URL` encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA exponent (`Base64URL` encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

impl Jwk {
    /// Build an RSA decoding key from the modulus and exponent.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidKey` if the key is not a usable RSA key.
    pub fn decoding_key(&self) -> Result<DecodingKey, TokenError> {
        if self.kty != "RSA" {
            return Err(TokenError::InvalidKey(format!(
                "Unsupported key type: {}",
                self.kty
            )));
        }
        let n = self
            .n
            .as_deref()
            .ok_or_else(|| TokenError::InvalidKey("Missing modulus (n)".to_string()))?;
        let e = self
            .e
            .as_deref()
            .ok_or_else(|| TokenError::InvalidKey("Missing exponent (e)".to_string()))?;

        DecodingKey::from_rsa_components(n, e)
            .map_err(|err| TokenError::InvalidKey(format!("Invalid RSA components: {err}")))
    }

    /// Check if this key may be used for signature verification.
    #[must_use]
    pub fn is_signing_key(&self) -> bool {
        self.key_use.as_deref().map_or(true, |u| u == "sig")
    }
}

/// A JSON Web Key Set as defined in RFC 7517.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwkSet {
    /// Array of JWK values.
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Find a key by its kid.
    #[must_use]
    pub fn find_key(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }

    /// First signing key (used for tokens without a kid).
    #[must_use]
    pub fn first_signing_key(&self) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.is_signing_key())
    }
}

struct CachedJwks {
    jwks: JwkSet,
    fetched_at: Instant,
}

/// JWKS client with caching support.
///
/// ```rust,ignore
/// let client = JwksClient::new("https://sod.superoffice.com/login/.well-known/jwks")?;
/// let claims = client.validate(&token, &ValidationConfig::default()).await?;
/// ```
#[derive(Clone)]
pub struct JwksClient {
    url: String,
    cache: Arc<RwLock<Option<CachedJwks>>>,
    cache_ttl: Duration,
    http_client: reqwest::Client,
}

impl JwksClient {
    /// Create a new JWKS client with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::JwksFetchFailed` if the HTTP client cannot be created.
    pub fn new(url: impl Into<String>) -> Result<Self, TokenError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                TokenError::JwksFetchFailed(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self::with_client(url, http_client))
    }

    /// Create a JWKS client sharing an existing HTTP client.
    pub fn with_client(url: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            cache: Arc::new(RwLock::new(None)),
            cache_ttl: Duration::from_secs(300),
            http_client,
        }
    }

    /// Key set URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch JWKS from the endpoint, replacing the cache.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::JwksFetchFailed` if the fetch fails.
    pub async fn fetch_jwks(&self) -> Result<JwkSet, TokenError> {
        debug!(url = %self.url, "Fetching JWKS");
        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| TokenError::JwksFetchFailed(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(TokenError::JwksFetchFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| TokenError::JwksFetchFailed(format!("Invalid JSON: {e}")))?;

        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            jwks: jwks.clone(),
            fetched_at: Instant::now(),
        });

        Ok(jwks)
    }

    /// Get JWKS, using the cache if it is fresh.
    pub async fn get_jwks(&self) -> Result<JwkSet, TokenError> {
        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                if cached.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(cached.jwks.clone());
                }
            }
        }

        self.fetch_jwks().await
    }

    /// Get a key by kid, re-fetching once on a miss.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::KeyNotFound` if the key is not found after re-fetch.
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, TokenError> {
        let jwks = self.get_jwks().await?;
        if let Some(key) = jwks.find_key(kid) {
            return Ok(key.clone());
        }

        debug!(kid, "Key not in cached JWKS, re-fetching");
        let jwks = self.fetch_jwks().await?;
        jwks.find_key(kid)
            .cloned()
            .ok_or_else(|| TokenError::KeyNotFound(kid.to_string()))
    }

    /// Validate a token against the key set and return its claims.
    ///
    /// Tokens without a kid are checked against the first signing key.
    pub async fn validate(
        &self,
        token: &str,
        config: &ValidationConfig,
    ) -> Result<Map<String, Value>, TokenError> {
        let jwk = match extract_kid(token)? {
            Some(kid) => self.get_key(&kid).await?,
            None => self
                .get_jwks()
                .await?
                .first_signing_key()
                .cloned()
                .ok_or_else(|| TokenError::KeyNotFound("(no signing key)".to_string()))?,
        };

        decode_claims(token, &jwk.decoding_key()?, config)
    }
}

impl std::fmt::Debug for JwksClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksClient")
            .field("url", &self.url)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::test_keys::{encode, MODULUS_B64};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_jwk(kid: &str) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            kid: Some(kid.to_string()),
            key_use: Some("sig".to_string()),
            alg: Some("RS256".to_string()),
            n: Some(MODULUS_B64.to_string()),
            e: Some("AQAB".to_string()),
        }
    }

    fn token(kid: Option<&str>) -> String {
        encode(
            &json!({
                "sub": "u1",
                "exp": chrono::Utc::now().timestamp() + 600,
                "http://schemes.superoffice.net/identity/ctx": "Cust1"
            }),
            kid,
        )
    }

    #[test]
    fn test_jwk_set_find_key() {
        let jwks = JwkSet {
            keys: vec![test_jwk("key-1"), test_jwk("key-2")],
        };
        assert!(jwks.find_key("key-1").is_some());
        assert!(jwks.find_key("key-2").is_some());
        assert!(jwks.find_key("key-3").is_none());
    }

    #[test]
    fn test_first_signing_key_skips_encryption_keys() {
        let mut enc = test_jwk("enc");
        enc.key_use = Some("enc".to_string());
        let jwks = JwkSet {
            keys: vec![enc, test_jwk("sig")],
        };
        assert_eq!(
            jwks.first_signing_key().and_then(|k| k.kid.as_deref()),
            Some("sig")
        );
    }

    #[test]
    fn test_decoding_key_missing_components() {
        let mut jwk = test_jwk("k");
        jwk.n = None;
        assert!(matches!(jwk.decoding_key(), Err(TokenError::InvalidKey(_))));

        let mut jwk = test_jwk("k");
        jwk.e = None;
        assert!(matches!(jwk.decoding_key(), Err(TokenError::InvalidKey(_))));

        let mut jwk = test_jwk("k");
        jwk.kty = "EC".to_string();
        assert!(matches!(jwk.decoding_key(), Err(TokenError::InvalidKey(_))));
    }

    #[test]
    fn test_jwk_serialization_renames_use() {
        let json = serde_json::to_string(&test_jwk("key-1")).unwrap();
        assert!(json.contains("\"use\":\"sig\""));
    }

    #[tokio::test]
    async fn test_validate_with_kid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(JwkSet {
                keys: vec![test_jwk("key-1")],
            }))
            .expect(1)
            .mount(&server)
            .await;

        let client = JwksClient::new(format!("{}/jwks", server.uri())).unwrap();
        let claims = client
            .validate(&token(Some("key-1")), &ValidationConfig::default())
            .await
            .unwrap();
        assert_eq!(claims["sub"], "u1");

        // Second validation is served from cache
        client
            .validate(&token(Some("key-1")), &ValidationConfig::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_validate_without_kid_uses_first_signing_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(JwkSet {
                keys: vec![test_jwk("only")],
            }))
            .mount(&server)
            .await;

        let client = JwksClient::new(format!("{}/jwks", server.uri())).unwrap();
        assert!(client
            .validate(&token(None), &ValidationConfig::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_unknown_kid_refetches_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(JwkSet {
                keys: vec![test_jwk("key-1")],
            }))
            .expect(2)
            .mount(&server)
            .await;

        let client = JwksClient::new(format!("{}/jwks", server.uri())).unwrap();
        let err = client
            .validate(&token(Some("rotated")), &ValidationConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err, TokenError::KeyNotFound("rotated".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = JwksClient::new(format!("{}/jwks", server.uri())).unwrap();
        assert!(matches!(
            client.fetch_jwks().await,
            Err(TokenError::JwksFetchFailed(_))
        ));
    }
}
