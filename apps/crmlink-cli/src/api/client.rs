//! Shared HTTP client setup

use crate::error::{CliError, CliResult};
use crate::logging::Redactor;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, trace};

/// Longest body excerpt written to debug logs.
const MAX_LOGGED_BODY: usize = 2048;

/// Build the HTTP client shared by all outbound calls
pub fn build_http_client(timeout_secs: u64) -> CliResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("crmlink/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| CliError::Network(format!("Failed to create HTTP client: {e}")))
}

/// Log one request/response pair with secrets masked
pub fn log_exchange(method: &str, url: &str, status: StatusCode, body: &str) {
    debug!(method, url, status = status.as_u16(), "HTTP exchange");

    let redacted = Redactor::new().redact_string(body);
    let excerpt = truncate_chars(&redacted, MAX_LOGGED_BODY);
    trace!(method, url, body = %excerpt, "HTTP response body");
}

/// Truncate on a char boundary
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}... (truncated)", &text[..idx]),
        None => text.to_string(),
    }
}
