//! Session and invocation error types.

use crmlink_auth::AuthError;
use std::error::Error as StdError;
use thiserror::Error;

/// Boxed error used as the cause of an invocation failure.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Failure of a resource client call.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The endpoint answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// The request never produced a usable response (connect, timeout, decode).
    #[error("Transport failure: {message}")]
    TransportFailure {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The RPC proxy call failed.
    #[error("RPC failure: {message}")]
    RpcFailure {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl InvocationError {
    /// Transport failure wrapping an underlying error.
    pub fn transport(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        InvocationError::TransportFailure {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// RPC failure wrapping an underlying error.
    pub fn rpc(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        InvocationError::RpcFailure {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// RPC failure without an underlying cause.
    pub fn rpc_message(message: impl Into<String>) -> Self {
        InvocationError::RpcFailure {
            message: message.into(),
            source: None,
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            InvocationError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message of the innermost cause.
    pub fn root_message(&self) -> String {
        root_cause(self).to_string()
    }
}

/// Errors surfaced by the session orchestrator.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    /// An operation that needs a session was attempted without one.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The operation was aborted by the cancellation signal.
    #[error("Operation cancelled")]
    Cancelled,
}

impl SessionError {
    /// The wrapped auth error, if any.
    pub fn as_auth(&self) -> Option<&AuthError> {
        match self {
            SessionError::Auth(e) => Some(e),
            _ => None,
        }
    }

    /// The wrapped invocation error, if any.
    pub fn as_invocation(&self) -> Option<&InvocationError> {
        match self {
            SessionError::Invocation(e) => Some(e),
            _ => None,
        }
    }
}

/// Walk an error's `source()` chain to the innermost cause.
pub fn root_cause<'a>(err: &'a (dyn StdError + 'static)) -> &'a (dyn StdError + 'static) {
    let mut current = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current
}
