//! CLI error types and exit codes

use crmlink_auth::AuthError;
use crmlink_session::{InvocationError, SessionError};
use thiserror::Error;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: Configuration or I/O error
/// - 2: Authentication error
/// - 3: Network error
/// - 4: Request rejected by the server (4xx)
/// - 5: Server error
/// - 130: Cancelled with Ctrl-C
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Not signed in.")]
    NotAuthenticated,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Connection failed: {0}\n\nTroubleshooting:\n  - Check your internet connection\n  - Verify the tenant environment in the settings file\n  - Try again in a few moments")]
    ConnectionFailed(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotAuthenticated
            | CliError::AuthenticationFailed(_)
            | CliError::MissingClaim(_)
            | CliError::RefreshFailed(_) => 2,
            CliError::Network(_) | CliError::ConnectionFailed(_) => 3,
            CliError::Server(_) => 5,
            CliError::Api { status, .. } => {
                if *status >= 500 {
                    5
                } else if *status == 401 || *status == 403 {
                    2
                } else {
                    4
                }
            }
            CliError::Config(_) | CliError::Io(_) => 1,
            CliError::Cancelled => 130,
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        let use_color = crate::output::use_color();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {}", suggestion);
            } else {
                eprintln!("\nSuggestion: {}", suggestion);
            }
        }
    }

    /// Get a suggested action for this error
    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::NotAuthenticated => Some("Run 'crmlink interactive' to sign in."),
            CliError::MissingClaim(_) => Some(
                "The identity provider did not issue tenant claims. Check that the application is registered for this tenant.",
            ),
            CliError::Config(_) => {
                Some("Check the settings file, or point --settings / CRMLINK_SETTINGS at the right one.")
            }
            CliError::ConnectionFailed(_) => Some("Check your network connection and try again."),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CliError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            CliError::ConnectionFailed(e.to_string())
        } else if e.is_timeout() {
            CliError::Network("Request timed out".to_string())
        } else {
            CliError::Network(e.to_string())
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Config(format!("JSON error: {}", e))
    }
}

impl From<AuthError> for CliError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingClaim(name) => CliError::MissingClaim(name),
            AuthError::NoRefreshToken | AuthError::RefreshRejected(_) => {
                CliError::RefreshFailed(e.to_string())
            }
            AuthError::InvalidToken(message) => CliError::AuthenticationFailed(message),
        }
    }
}

impl From<InvocationError> for CliError {
    fn from(e: InvocationError) -> Self {
        match e {
            InvocationError::HttpStatus { status, message } => CliError::Api { status, message },
            InvocationError::TransportFailure { .. } => CliError::Network(e.root_message()),
            InvocationError::RpcFailure { .. } => CliError::Server(e.root_message()),
        }
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Auth(e) => e.into(),
            SessionError::Invocation(e) => e.into(),
            SessionError::NotAuthenticated => CliError::NotAuthenticated,
            SessionError::Cancelled => CliError::Cancelled,
        }
    }
}
