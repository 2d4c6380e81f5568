//! Integration tests for the interactive OIDC sign-in
//!
//! The browser is replaced by a launcher that follows the authorization
//! URL straight to the loopback redirect, so the whole flow runs against
//! a mock identity provider:
//! - Discovery, code exchange with PKCE and id token validation
//! - Provider errors on the redirect
//! - Refresh with and without token rotation, and rejected refresh

mod common;

use async_trait::async_trait;
use common::{sign, TestContext, CONTEXT_IDENTIFIER, PRINCIPAL, TICKET};
use crmlink_auth::AuthError;
use crmlink_cli::oidc::{BrowserLauncher, OidcAcquirer, OidcOptions};
use crmlink_session::{SessionError, SessionOrchestrator, SessionState};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

const TOKEN_PATH: &str = "/login/common/oauth/tokens";

#[derive(Clone, Copy)]
enum Reply {
    Code,
    Denied,
}

/// Browser stand-in that answers the authorization request itself.
#[derive(Clone)]
struct CallbackBrowser {
    reply: Reply,
    seen: Arc<Mutex<Vec<String>>>,
}

impl CallbackBrowser {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            seen: Arc::default(),
        }
    }

    fn last_query(&self) -> HashMap<String, String> {
        let seen = self.seen.lock().unwrap();
        let url = url::Url::parse(seen.last().expect("browser was launched")).unwrap();
        url.query_pairs().into_owned().collect()
    }
}

#[async_trait]
impl BrowserLauncher for CallbackBrowser {
    async fn launch(&self, url: &str) {
        self.seen.lock().unwrap().push(url.to_string());

        let query: HashMap<String, String> = url::Url::parse(url)
            .unwrap()
            .query_pairs()
            .into_owned()
            .collect();
        let redirect = &query["redirect_uri"];
        let state = &query["state"];
        let target = match self.reply {
            Reply::Code => format!("{redirect}/?code=auth-code-1&state={state}"),
            Reply::Denied => format!(
                "{redirect}/?error=access_denied&error_description=User+cancelled&state={state}"
            ),
        };

        // The listener only accepts once launch returns.
        tokio::spawn(async move {
            let _ = reqwest::get(target).await;
        });
    }
}

fn acquirer(ctx: &TestContext, browser: CallbackBrowser) -> OidcAcquirer {
    let options = OidcOptions::new(ctx.authority(), "client-1", "s3cret")
        .with_login_timeout(Duration::from_secs(10));
    OidcAcquirer::new(ctx.http.clone(), options).with_browser(browser)
}

async fn mock_code_exchange(ctx: &TestContext, id_token: String) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-1"))
        .and(body_string_contains("code_verifier="))
        .and(body_string_contains("client_id=client-1"))
        .and(body_string_contains("client_secret=s3cret"))
        .and(body_string_contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "8A:Cust12345.Access1",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-1",
            "id_token": id_token,
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;
}

async fn signed_in(ctx: &TestContext) -> SessionOrchestrator<OidcAcquirer> {
    ctx.mock_discovery().await;
    ctx.mock_jwks().await;
    mock_code_exchange(ctx, sign(&ctx.tenant_claims())).await;

    let mut orchestrator =
        SessionOrchestrator::new(acquirer(ctx, CallbackBrowser::new(Reply::Code)));
    orchestrator.authenticate().await.unwrap();
    orchestrator
}

#[tokio::test]
async fn test_sign_in_derives_context() {
    let ctx = TestContext::new().await;
    ctx.mock_discovery().await;
    ctx.mock_jwks().await;
    mock_code_exchange(&ctx, sign(&ctx.tenant_claims())).await;

    let browser = CallbackBrowser::new(Reply::Code);
    let mut orchestrator = SessionOrchestrator::new(acquirer(&ctx, browser.clone()));
    let credential = orchestrator.authenticate().await.unwrap();

    assert_eq!(credential.access_token, "8A:Cust12345.Access1");
    assert_eq!(credential.refresh_token(), Some("refresh-1"));
    assert!(credential.id_token.is_some());
    assert_eq!(credential.claims.get("sub"), Some(PRINCIPAL));

    let context = orchestrator.context().unwrap();
    assert_eq!(context.context_identifier(), CONTEXT_IDENTIFIER);
    assert_eq!(context.ticket(), TICKET);
    assert_eq!(context.netserver_url(), ctx.netserver_url());
    assert_eq!(context.principal(), Some(PRINCIPAL));

    let query = browser.last_query();
    assert_eq!(query["client_id"], "client-1");
    assert_eq!(query["scope"], "openid profile");
    assert_eq!(query["code_challenge_method"], "S256");
    assert!(query["redirect_uri"].starts_with("http://127.0.0.1:"));
}

#[tokio::test]
async fn test_denied_sign_in_is_invalid_token() {
    let ctx = TestContext::new().await;
    ctx.mock_discovery().await;

    let mut orchestrator =
        SessionOrchestrator::new(acquirer(&ctx, CallbackBrowser::new(Reply::Denied)));
    let err = orchestrator.authenticate().await.unwrap_err();

    match err {
        SessionError::Auth(AuthError::InvalidToken(message)) => {
            assert_eq!(
                message,
                "Authorization failed: access_denied: User cancelled"
            );
        }
        other => panic!("Expected InvalidToken, got {other:?}"),
    }
    assert_eq!(orchestrator.state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_id_token_for_other_audience_rejected() {
    let ctx = TestContext::new().await;
    ctx.mock_discovery().await;
    ctx.mock_jwks().await;
    let mut claims = ctx.tenant_claims();
    claims["aud"] = json!("another-client");
    mock_code_exchange(&ctx, sign(&claims)).await;

    let mut orchestrator =
        SessionOrchestrator::new(acquirer(&ctx, CallbackBrowser::new(Reply::Code)));
    let err = orchestrator.authenticate().await.unwrap_err();

    assert!(matches!(err, SessionError::Auth(AuthError::InvalidToken(_))));
    assert!(!orchestrator.is_authenticated());
}

#[tokio::test]
async fn test_id_token_without_tenant_claims_names_missing_claim() {
    let ctx = TestContext::new().await;
    ctx.mock_discovery().await;
    ctx.mock_jwks().await;
    let mut claims = ctx.tenant_claims();
    claims
        .as_object_mut()
        .unwrap()
        .remove(crmlink_auth::TICKET_CLAIM);
    mock_code_exchange(&ctx, sign(&claims)).await;

    let mut orchestrator =
        SessionOrchestrator::new(acquirer(&ctx, CallbackBrowser::new(Reply::Code)));
    let err = orchestrator.authenticate().await.unwrap_err();

    assert_eq!(
        err.as_auth(),
        Some(&AuthError::MissingClaim(crmlink_auth::TICKET_CLAIM.to_string()))
    );
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token_and_claims() {
    let ctx = TestContext::new().await;
    let mut orchestrator = signed_in(&ctx).await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "8A:Cust12345.Access2",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let refreshed = orchestrator.refresh().await.unwrap();

    assert_eq!(refreshed.access_token, "8A:Cust12345.Access2");
    assert_eq!(refreshed.refresh_token(), Some("refresh-1"));
    assert_eq!(
        orchestrator.credential().unwrap().access_token,
        "8A:Cust12345.Access2"
    );
    assert_eq!(
        orchestrator.context().unwrap().context_identifier(),
        CONTEXT_IDENTIFIER
    );
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let ctx = TestContext::new().await;
    let mut orchestrator = signed_in(&ctx).await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "8A:Cust12345.Access2",
            "refresh_token": "refresh-2",
            "id_token": sign(&ctx.tenant_claims()),
            "expires_in": 3600
        })))
        .mount(&ctx.server)
        .await;

    let refreshed = orchestrator.refresh().await.unwrap();
    assert_eq!(refreshed.refresh_token(), Some("refresh-2"));
    assert_eq!(refreshed.claims.get("sub"), Some(PRINCIPAL));
}

#[tokio::test]
async fn test_rejected_refresh_keeps_unexpired_session() {
    let ctx = TestContext::new().await;
    let mut orchestrator = signed_in(&ctx).await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Refresh token expired"
        })))
        .mount(&ctx.server)
        .await;

    let err = orchestrator.refresh().await.unwrap_err();

    assert_eq!(
        err.as_auth(),
        Some(&AuthError::RefreshRejected(
            "invalid_grant: Refresh token expired".to_string()
        ))
    );
    assert!(orchestrator.is_authenticated());
    assert_eq!(
        orchestrator.credential().unwrap().access_token,
        "8A:Cust12345.Access1"
    );
}
