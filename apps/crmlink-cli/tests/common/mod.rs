//! Shared fixtures for crmlink-cli integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use crmlink_auth::{
    AuthError, Credential, IdentityClaims, CONTEXT_IDENTIFIER_CLAIM, NETSERVER_URL_CLAIM,
    TICKET_CLAIM, WEBAPI_URL_CLAIM,
};
use crmlink_session::CredentialAcquirer;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// RSA key pair shared by the signing fixtures.
pub const PRIVATE_KEY: &str = include_str!("../fixtures/system_user_key.pem");
pub const PUBLIC_KEY: &str = include_str!("../fixtures/system_user_key.pub.pem");

/// Base64url modulus of `PUBLIC_KEY`.
pub const MODULUS_B64: &str = "uOs2bjkrVK1Vi6uSrZAGjy_YTQlC0eMz4YLJHVDgdXPm8UYjonBBykwbKm-C0p4syG93yBDeV7lC-U8zgSk94QHP4CilO9VShORDHG37iy1cU6o9PCto-z8wgoc88nWRowFn4rJ3QEnkDyCdRzNy4d1YV2q97sMW6U9iqsefQu0g6Qkx7GcLy1TLqchIi_tfKxSO7w75Zx8bqBuXZBmYcmay3ysdQN3l-PVIm4ic_CpuFLW0XmeTvlUp3R2JoSxVySh3faTq-18cspk7nBiW5mTpko2924GiIWMh_graaMU7agn1ItpBwmXQtXBhfd1J6i5jSKu53NGG4SSXPvu9jQ";

pub const KID: &str = "test-key-1";
pub const CONTEXT_IDENTIFIER: &str = "Cust12345";
pub const TICKET: &str = "7T:dGlja2V0";
pub const PRINCIPAL: &str = "jdoe";

/// Path the identity provider's key set is served from.
pub const JWKS_PATH: &str = "/login/.well-known/jwks";

/// Test context with a mock CRM / identity server
pub struct TestContext {
    pub server: MockServer,
    pub http: reqwest::Client,
}

impl TestContext {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// Identity provider authority
    pub fn authority(&self) -> String {
        format!("{}/login", self.server.uri())
    }

    pub fn webapi_url(&self) -> String {
        format!("{}/Cust12345/api", self.server.uri())
    }

    pub fn netserver_url(&self) -> String {
        format!("{}/Cust12345/Remote/Services88", self.server.uri())
    }

    /// The four tenant claims plus a principal and the standard JWT fields
    pub fn tenant_claims(&self) -> Value {
        json!({
            "sub": PRINCIPAL,
            "iss": self.authority(),
            "aud": "client-1",
            "exp": Utc::now().timestamp() + 3600,
            "iat": Utc::now().timestamp(),
            WEBAPI_URL_CLAIM: self.webapi_url(),
            NETSERVER_URL_CLAIM: self.netserver_url(),
            CONTEXT_IDENTIFIER_CLAIM: CONTEXT_IDENTIFIER,
            TICKET_CLAIM: TICKET,
        })
    }

    /// An already validated credential for the mock tenant
    pub fn credential(&self) -> Credential {
        let claims = IdentityClaims::new()
            .with("sub", PRINCIPAL)
            .with(WEBAPI_URL_CLAIM, self.webapi_url())
            .with(NETSERVER_URL_CLAIM, self.netserver_url())
            .with(CONTEXT_IDENTIFIER_CLAIM, CONTEXT_IDENTIFIER)
            .with(TICKET_CLAIM, TICKET);
        Credential::new(
            "8A:Cust12345.AccessToken",
            Some("refresh-1".to_string()),
            claims,
            Utc::now() + Duration::hours(1),
        )
    }

    pub async fn mock_jwks(&self) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_json()))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_discovery(&self) {
        let base = self.authority();
        Mock::given(method("GET"))
            .and(path("/login/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": base,
                "authorization_endpoint": format!("{base}/common/oauth/authorize"),
                "token_endpoint": format!("{base}/common/oauth/tokens"),
                "jwks_uri": format!("{}{JWKS_PATH}", self.server.uri()),
                "end_session_endpoint": format!("{base}/logout"),
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_rest_contact(&self, id: i32, status: u16, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/Cust12345/api/v1/Contact/{id}")))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_proxy_contact(&self, status: u16, body: Value) {
        Mock::given(method("POST"))
            .and(path(
                "/Cust12345/Remote/Services88/api/v1/Agents/Contact/GetContactEntity",
            ))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }
}

pub fn jwks_json() -> Value {
    json!({
        "keys": [{
            "kty": "RSA",
            "kid": KID,
            "use": "sig",
            "alg": "RS256",
            "n": MODULUS_B64,
            "e": "AQAB"
        }]
    })
}

/// Sign claims as the identity provider would.
pub fn sign(claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KID.to_string());
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes()).unwrap();
    jsonwebtoken::encode(&header, claims, &key).unwrap()
}

pub fn contact_json(id: i32, name: &str) -> Value {
    json!({
        "ContactId": id,
        "Name": name,
        "Department": "Sales",
        "OrgNr": "NO-998877"
    })
}

/// Acquirer that hands out a fixed credential
pub struct StaticAcquirer {
    credential: Credential,
    refresh_result: Mutex<Result<Credential, AuthError>>,
    pub acquire_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
}

impl StaticAcquirer {
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            refresh_result: Mutex::new(Err(AuthError::RefreshRejected(
                "invalid_grant".to_string(),
            ))),
            acquire_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_refresh(self, result: Result<Credential, AuthError>) -> Self {
        *self.refresh_result.lock().unwrap() = result;
        self
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialAcquirer for StaticAcquirer {
    fn name(&self) -> &str {
        "static"
    }

    async fn acquire(&self) -> Result<Credential, AuthError> {
        self.acquire_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.credential.clone())
    }

    async fn validate(&self, credential: Credential) -> Result<Credential, AuthError> {
        Ok(credential)
    }

    async fn refresh(&self, _current: &Credential) -> Result<Credential, AuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_result.lock().unwrap().clone()
    }
}
