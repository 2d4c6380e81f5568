//! Session orchestrator.
//!
//! Sequences acquisition, validation and context derivation, dispatches
//! resource calls under the derived context, and owns refresh. The active
//! credential and its context are only ever replaced together, after every
//! step of an authentication or refresh has succeeded.

use crate::acquirer::CredentialAcquirer;
use crate::context::{derive_context, SessionContext};
use crate::error::{InvocationError, SessionError};
use crate::resource::{CallContext, ResourceClient, ResourceRequest, ResourceResponse};
use crate::state::{RefreshPolicy, SessionState};
use crmlink_auth::{AuthError, Credential};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

struct ActiveSession {
    credential: Credential,
    context: SessionContext,
}

/// Owns the single logical session of the process.
pub struct SessionOrchestrator<A> {
    acquirer: A,
    policy: RefreshPolicy,
    cancel: CancellationToken,
    state: SessionState,
    active: Option<ActiveSession>,
}

impl<A: CredentialAcquirer> SessionOrchestrator<A> {
    /// Create an unauthenticated orchestrator.
    pub fn new(acquirer: A) -> Self {
        Self {
            acquirer,
            policy: RefreshPolicy::default(),
            cancel: CancellationToken::new(),
            state: SessionState::Unauthenticated,
            active: None,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn acquirer(&self) -> &A {
        &self.acquirer
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.active.is_some()
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.active.as_ref().map(|a| &a.credential)
    }

    pub fn context(&self) -> Option<&SessionContext> {
        self.active.as_ref().map(|a| &a.context)
    }

    /// Acquire, validate and derive a new session.
    ///
    /// A validation failure is final for this call; nothing is retried.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidToken` when acquisition or validation fails
    /// - `AuthError::MissingClaim` when the validated credential lacks a
    ///   required claim
    /// - `SessionError::Cancelled` when the cancellation token fires; the
    ///   previous session, if any, is kept
    pub async fn authenticate(&mut self) -> Result<Credential, SessionError> {
        let previous = self.state;
        self.state = SessionState::Authenticating;
        info!(acquirer = self.acquirer.name(), "Authenticating");

        let acquirer = &self.acquirer;
        let outcome = run_cancellable(&self.cancel, async {
            let raw = acquirer.acquire().await.map_err(as_invalid_token)?;
            let credential = acquirer.validate(raw).await.map_err(as_invalid_token)?;
            let context = derive_context(&credential)?;
            Ok::<_, SessionError>((credential, context))
        })
        .await;

        match outcome {
            Ok((credential, context)) => {
                info!(
                    context_identifier = context.context_identifier(),
                    expires_at = %credential.expires_at,
                    "Authenticated"
                );
                self.install(credential.clone(), context);
                Ok(credential)
            }
            Err(SessionError::Cancelled) => {
                warn!("Authentication cancelled");
                self.state = previous;
                Err(SessionError::Cancelled)
            }
            Err(e) => {
                error!(
                    context_identifier = self.context_identifier().unwrap_or("unknown"),
                    error = %e,
                    "Authentication failed"
                );
                self.clear();
                Err(e)
            }
        }
    }

    /// Dispatch one request to a resource client under the active session.
    ///
    /// An expired access token is refreshed first; when that refresh fails
    /// the request is not sent. A failed call leaves the session
    /// authenticated.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotAuthenticated` without an active session
    /// - `SessionError::Auth` when the pre-dispatch refresh fails
    /// - `SessionError::Invocation` when the client call fails
    /// - `SessionError::Cancelled` when the cancellation token fires
    pub async fn invoke(
        &mut self,
        client: &dyn ResourceClient,
        request: &ResourceRequest,
    ) -> Result<ResourceResponse, SessionError> {
        let expired = match &self.active {
            Some(active) => active.credential.is_expired(),
            None => return Err(SessionError::NotAuthenticated),
        };
        if expired {
            info!("Access token expired, refreshing before dispatch");
            self.refresh().await?;
        }

        let Some(active) = self.active.as_ref() else {
            return Err(SessionError::NotAuthenticated);
        };
        self.state = SessionState::Invoking;
        debug!(
            resource = %client.kind(),
            context_identifier = active.context.context_identifier(),
            request = ?request,
            "Invoking resource"
        );

        let call = CallContext {
            context: &active.context,
            access_token: &active.credential.access_token,
        };
        let outcome = run_cancellable(&self.cancel, async {
            client
                .invoke(call, request)
                .await
                .map_err(SessionError::from)
        })
        .await;
        self.state = SessionState::Authenticated;

        if let Err(SessionError::Invocation(e)) = &outcome {
            log_invocation_failure(active.context.context_identifier(), client, e);
        }
        outcome
    }

    /// Exchange the refresh token for a new credential and context.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotAuthenticated` without an active session
    /// - `AuthError::NoRefreshToken` when none was issued; the identity
    ///   provider is not contacted
    /// - `AuthError::RefreshRejected` when the provider declines
    /// - `AuthError::InvalidToken` / `MissingClaim` when the refreshed
    ///   credential does not validate
    /// - `SessionError::Cancelled` when the cancellation token fires; the
    ///   current session is kept
    ///
    /// On any auth failure the session follows the configured
    /// [`RefreshPolicy`].
    pub async fn refresh(&mut self) -> Result<Credential, SessionError> {
        let Some(active) = self.active.as_ref() else {
            return Err(SessionError::NotAuthenticated);
        };
        if active.credential.refresh_token().is_none() {
            return Err(self.refresh_failed(AuthError::NoRefreshToken).into());
        }

        self.state = SessionState::Refreshing;
        info!(
            context_identifier = active.context.context_identifier(),
            "Refreshing tokens"
        );

        let acquirer = &self.acquirer;
        let current = &active.credential;
        let outcome = run_cancellable(&self.cancel, async {
            let raw = acquirer.refresh(current).await.map_err(as_refresh_rejected)?;
            let credential = acquirer.validate(raw).await.map_err(as_invalid_token)?;
            let context = derive_context(&credential)?;
            Ok::<_, SessionError>((credential, context))
        })
        .await;

        match outcome {
            Ok((credential, context)) => {
                info!(
                    context_identifier = context.context_identifier(),
                    expires_at = %credential.expires_at,
                    "Tokens refreshed"
                );
                self.install(credential.clone(), context);
                Ok(credential)
            }
            Err(SessionError::Cancelled) => {
                warn!("Token refresh cancelled");
                self.state = SessionState::Authenticated;
                Err(SessionError::Cancelled)
            }
            Err(SessionError::Auth(e)) => Err(self.refresh_failed(e).into()),
            Err(other) => {
                self.state = SessionState::Authenticated;
                Err(other)
            }
        }
    }

    /// Drop the active session.
    pub fn logout(&mut self) {
        if self.active.is_some() {
            info!(
                context_identifier = self.context_identifier().unwrap_or("unknown"),
                "Session closed"
            );
        }
        self.clear();
    }

    fn context_identifier(&self) -> Option<&str> {
        self.active
            .as_ref()
            .map(|a| a.context.context_identifier())
    }

    fn install(&mut self, credential: Credential, context: SessionContext) {
        self.active = Some(ActiveSession {
            credential,
            context,
        });
        self.state = SessionState::Authenticated;
    }

    fn clear(&mut self) {
        self.active = None;
        self.state = SessionState::Unauthenticated;
    }

    /// Apply the refresh policy after a failed refresh.
    fn refresh_failed(&mut self, err: AuthError) -> AuthError {
        let context_identifier = self.context_identifier().unwrap_or("unknown").to_string();
        let still_valid = self
            .active
            .as_ref()
            .is_some_and(|a| !a.credential.is_expired());

        if self.policy == RefreshPolicy::KeepUntilExpiry && still_valid {
            warn!(
                context_identifier = %context_identifier,
                error = %err,
                "Token refresh failed, keeping current session until it expires"
            );
            self.state = SessionState::Authenticated;
        } else {
            error!(
                context_identifier = %context_identifier,
                error = %err,
                policy = %self.policy,
                "Token refresh failed, session closed"
            );
            self.clear();
        }
        err
    }
}

fn log_invocation_failure(context_identifier: &str, client: &dyn ResourceClient, err: &InvocationError) {
    error!(
        context_identifier,
        resource = %client.kind(),
        status = err.status(),
        cause = %err.root_message(),
        "Resource call failed"
    );
}

async fn run_cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, SessionError>
where
    F: Future<Output = Result<T, SessionError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SessionError::Cancelled),
        result = fut => result,
    }
}

fn as_invalid_token(err: AuthError) -> AuthError {
    match err {
        AuthError::InvalidToken(_) | AuthError::MissingClaim(_) => err,
        other => AuthError::InvalidToken(other.to_string()),
    }
}

fn as_refresh_rejected(err: AuthError) -> AuthError {
    if err.is_refresh_error() {
        err
    } else {
        AuthError::RefreshRejected(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_invalid_token_keeps_claim_errors() {
        let err = as_invalid_token(AuthError::MissingClaim("ctx".into()));
        assert_eq!(err, AuthError::MissingClaim("ctx".into()));

        let err = as_invalid_token(AuthError::RefreshRejected("nope".into()));
        assert_eq!(
            err,
            AuthError::InvalidToken("Token refresh rejected: nope".into())
        );
    }

    #[test]
    fn test_as_refresh_rejected_wraps_other_errors() {
        let err = as_refresh_rejected(AuthError::InvalidToken("bad".into()));
        assert_eq!(err, AuthError::RefreshRejected("Invalid token: bad".into()));
        assert_eq!(
            as_refresh_rejected(AuthError::NoRefreshToken),
            AuthError::NoRefreshToken
        );
    }

    #[tokio::test]
    async fn test_run_cancellable_prefers_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let result: Result<u8, SessionError> = run_cancellable(&token, async { Ok(1) }).await;
        assert!(matches!(result, Err(SessionError::Cancelled)));
    }

    #[tokio::test]
    async fn test_run_cancellable_passes_result_through() {
        let token = CancellationToken::new();
        let result = run_cancellable(&token, async { Ok::<_, SessionError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
