//! Credential acquisition seam.

use async_trait::async_trait;
use crmlink_auth::{AuthError, Credential};

/// Source of identity assertions.
///
/// Implementations talk to an identity provider. The orchestrator always
/// runs `validate` on whatever `acquire` or `refresh` return before the
/// credential is used.
#[async_trait]
pub trait CredentialAcquirer: Send + Sync {
    /// Short name used in log events (`oidc`, `system-user`).
    fn name(&self) -> &str;

    /// Obtain a fresh, not yet validated credential.
    async fn acquire(&self) -> Result<Credential, AuthError>;

    /// Verify a credential and return it with its identity claims filled in.
    async fn validate(&self, credential: Credential) -> Result<Credential, AuthError>;

    /// Exchange the refresh token of `current` for a new credential.
    ///
    /// Only called when `current` carries a non-empty refresh token.
    async fn refresh(&self, current: &Credential) -> Result<Credential, AuthError>;
}
