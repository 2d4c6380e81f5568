//! NetServer proxy contact client
//!
//! Every call carries its own [`ProxyConfig`]; nothing about the tenant is
//! kept in process-wide state. The HTTP transport talks to the contact
//! agent with the session ticket and the application token.

use super::client::{log_exchange, truncate_chars};
use async_trait::async_trait;
use crmlink_session::{
    CallContext, ContactEntity, InvocationError, ResourceClient, ResourceKind, ResourceRequest,
    ResourceResponse, SessionContext,
};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

/// Agent endpoint, relative to the NetServer base URL.
pub const GET_CONTACT_ENTITY_PATH: &str = "api/v1/Agents/Contact/GetContactEntity";

/// Session-scoped settings for one proxy call
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub remote_base_url: String,
    pub application_token: String,
    pub ticket: String,
}

impl ProxyConfig {
    /// Build from a derived session context and the configured application token.
    pub fn from_context(context: &SessionContext, application_token: impl Into<String>) -> Self {
        Self {
            remote_base_url: context.netserver_url().to_string(),
            application_token: application_token.into(),
            ticket: context.ticket().to_string(),
        }
    }

    /// Absolute URL of an agent endpoint
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.remote_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("remote_base_url", &self.remote_base_url)
            .field("application_token", &"[REDACTED]")
            .field("ticket", &"[REDACTED]")
            .finish()
    }
}

/// Wire transport for proxy calls
#[async_trait]
pub trait ProxyTransport: Send + Sync {
    async fn get_contact_entity(
        &self,
        config: &ProxyConfig,
        contact_id: i32,
    ) -> Result<ContactEntity, InvocationError>;
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetContactEntityRequest {
    contact_entity_id: i32,
}

/// JSON-over-HTTP transport to the contact agent
#[derive(Debug, Clone)]
pub struct HttpProxyTransport {
    http: Client,
}

impl HttpProxyTransport {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ProxyTransport for HttpProxyTransport {
    async fn get_contact_entity(
        &self,
        config: &ProxyConfig,
        contact_id: i32,
    ) -> Result<ContactEntity, InvocationError> {
        let url = config.endpoint(GET_CONTACT_ENTITY_PATH);

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("SOTicket {}", config.ticket))
            .header("SO-AppToken", &config.application_token)
            .header(ACCEPT, "application/json")
            .json(&GetContactEntityRequest {
                contact_entity_id: contact_id,
            })
            .send()
            .await
            .map_err(|e| InvocationError::rpc("GetContactEntity request failed", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| InvocationError::rpc("GetContactEntity response unreadable", e))?;
        log_exchange("POST", &url, status, &body);

        if !status.is_success() {
            return Err(InvocationError::rpc_message(format!(
                "GetContactEntity returned HTTP {}: {}",
                status.as_u16(),
                truncate_chars(body.trim(), 200)
            )));
        }

        let entity: Option<ContactEntity> = serde_json::from_str(&body)
            .map_err(|e| InvocationError::rpc("GetContactEntity returned an unexpected body", e))?;
        entity.ok_or_else(|| InvocationError::rpc_message(format!("Contact {contact_id} not found")))
    }
}

/// Fetches contacts through the NetServer proxy layer.
pub struct ProxyContactClient<T = HttpProxyTransport> {
    transport: T,
    application_token: String,
}

impl ProxyContactClient<HttpProxyTransport> {
    pub fn new(http: Client, application_token: impl Into<String>) -> Self {
        Self::with_transport(HttpProxyTransport::new(http), application_token)
    }
}

impl<T: ProxyTransport> ProxyContactClient<T> {
    pub fn with_transport(transport: T, application_token: impl Into<String>) -> Self {
        Self {
            transport,
            application_token: application_token.into(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait]
impl<T: ProxyTransport> ResourceClient for ProxyContactClient<T> {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Proxy
    }

    async fn invoke(
        &self,
        call: CallContext<'_>,
        request: &ResourceRequest,
    ) -> Result<ResourceResponse, InvocationError> {
        let ResourceRequest::Contact { id } = request;
        let config = ProxyConfig::from_context(call.context, self.application_token.as_str());
        debug!(
            remote_base_url = %config.remote_base_url,
            context_identifier = call.context.context_identifier(),
            "Configured proxy call"
        );

        let entity = self
            .transport
            .get_contact_entity(&config, *id)
            .await
            .map_err(into_rpc_failure)?;
        Ok(ResourceResponse::Contact(entity))
    }
}

/// Proxy failures always surface as RPC failures.
fn into_rpc_failure(err: InvocationError) -> InvocationError {
    match err {
        InvocationError::RpcFailure { .. } => err,
        other => InvocationError::rpc(other.to_string(), other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crmlink_auth::{
        Credential, IdentityClaims, CONTEXT_IDENTIFIER_CLAIM, NETSERVER_URL_CLAIM, TICKET_CLAIM,
        WEBAPI_URL_CLAIM,
    };

    fn context() -> SessionContext {
        let claims = IdentityClaims::new()
            .with(WEBAPI_URL_CLAIM, "https://w")
            .with(NETSERVER_URL_CLAIM, "https://x/Remote/Services88/")
            .with(CONTEXT_IDENTIFIER_CLAIM, "T1")
            .with(TICKET_CLAIM, "abc");
        let credential = Credential::new(
            "token",
            None,
            claims,
            chrono::Utc::now() + chrono::Duration::hours(1),
        );
        SessionContext::derive(&credential).unwrap()
    }

    #[test]
    fn test_config_from_context() {
        let config = ProxyConfig::from_context(&context(), "app-token");
        assert_eq!(config.remote_base_url, "https://x/Remote/Services88/");
        assert_eq!(config.ticket, "abc");
        assert_eq!(config.application_token, "app-token");
        assert_eq!(
            config.endpoint(GET_CONTACT_ENTITY_PATH),
            "https://x/Remote/Services88/api/v1/Agents/Contact/GetContactEntity"
        );
    }

    #[test]
    fn test_config_debug_hides_secrets() {
        let debug = format!("{:?}", ProxyConfig::from_context(&context(), "app-token"));
        assert!(!debug.contains("app-token"));
        assert!(!debug.contains("abc"));
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(GetContactEntityRequest {
            contact_entity_id: 5,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"ContactEntityId": 5}));
    }

    #[test]
    fn test_non_rpc_errors_are_wrapped() {
        let err = into_rpc_failure(InvocationError::HttpStatus {
            status: 500,
            message: "boom".to_string(),
        });
        assert!(matches!(err, InvocationError::RpcFailure { .. }));
        assert_eq!(err.root_message(), "HTTP 500: boom");
    }
}
