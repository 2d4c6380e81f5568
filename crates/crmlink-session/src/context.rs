//! Session context derived from a credential's identity claims.

use crmlink_auth::{
    AuthError, Credential, IdentityClaims, CONTEXT_IDENTIFIER_CLAIM, NETSERVER_URL_CLAIM,
    TICKET_CLAIM, WEBAPI_URL_CLAIM,
};

/// Claim naming the signed-in principal, shown in console output.
pub const PRINCIPAL_CLAIM: &str = "sub";

/// Endpoints and tenant data used for downstream calls.
///
/// Immutable once derived. A refresh replaces the whole context.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionContext {
    webapi_url: String,
    netserver_url: String,
    context_identifier: String,
    ticket: String,
    principal: Option<String>,
}

impl SessionContext {
    /// Derive the context from a credential.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingClaim` naming the first absent claim,
    /// checked in the order webapi_url, netserver_url, ctx, ticket.
    pub fn derive(credential: &Credential) -> Result<Self, AuthError> {
        Self::from_claims(&credential.claims)
    }

    /// Derive the context from a bare claim set.
    ///
    /// # Errors
    ///
    /// See [`SessionContext::derive`].
    pub fn from_claims(claims: &IdentityClaims) -> Result<Self, AuthError> {
        let webapi_url = claims.require(WEBAPI_URL_CLAIM)?;
        let netserver_url = claims.require(NETSERVER_URL_CLAIM)?;
        let context_identifier = claims.require(CONTEXT_IDENTIFIER_CLAIM)?;
        let ticket = claims.require(TICKET_CLAIM)?;

        Ok(Self {
            webapi_url: webapi_url.to_string(),
            netserver_url: netserver_url.to_string(),
            context_identifier: context_identifier.to_string(),
            ticket: ticket.to_string(),
            principal: claims.get(PRINCIPAL_CLAIM).map(str::to_string),
        })
    }

    pub fn webapi_url(&self) -> &str {
        &self.webapi_url
    }

    pub fn netserver_url(&self) -> &str {
        &self.netserver_url
    }

    /// Tenant identifier (`Cust12345`-style).
    pub fn context_identifier(&self) -> &str {
        &self.context_identifier
    }

    pub fn ticket(&self) -> &str {
        &self.ticket
    }

    /// Signed-in principal, when the provider supplied one.
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("webapi_url", &self.webapi_url)
            .field("netserver_url", &self.netserver_url)
            .field("context_identifier", &self.context_identifier)
            .field("ticket", &"[REDACTED]")
            .field("principal", &self.principal)
            .finish()
    }
}

/// Derive a session context from a credential.
///
/// # Errors
///
/// See [`SessionContext::derive`].
pub fn derive_context(credential: &Credential) -> Result<SessionContext, AuthError> {
    SessionContext::derive(credential)
}
