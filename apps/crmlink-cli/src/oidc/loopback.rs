//! Loopback redirect receiver for the authorization code flow
//!
//! Binds an ephemeral port on 127.0.0.1, hands out
//! `http://127.0.0.1:{port}` as the redirect URI and waits for the browser
//! to deliver the authorization response.

use crmlink_auth::AuthError;
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

const SUCCESS_PAGE: &str =
    "<html><body><p>Sign-in complete. You can close this window.</p></body></html>";
const FAILURE_PAGE: &str =
    "<html><body><p>Sign-in failed. Return to the console for details.</p></body></html>";

/// Query parameters of a redirect request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams(HashMap<String, String>);

impl CallbackParams {
    /// Parse the query part of a request target. `None` when there is no query.
    pub fn from_target(target: &str) -> Option<Self> {
        let (_, query) = target.split_once('?')?;
        if query.is_empty() {
            return None;
        }
        let params = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        Some(Self(params))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Check the response against the expected state and extract the code.
    ///
    /// # Errors
    ///
    /// `AuthError::InvalidToken` for a provider error, a state mismatch or a
    /// missing code.
    pub fn into_code(self, expected_state: &str) -> Result<String, AuthError> {
        if let Some(error) = self.get("error") {
            let message = match self.get("error_description") {
                Some(description) => format!("{error}: {description}"),
                None => error.to_string(),
            };
            return Err(AuthError::InvalidToken(format!(
                "Authorization failed: {message}"
            )));
        }
        if self.get("state") != Some(expected_state) {
            return Err(AuthError::InvalidToken(
                "Authorization response state mismatch".to_string(),
            ));
        }
        self.get("code").map(str::to_string).ok_or_else(|| {
            AuthError::InvalidToken("Authorization response has no code".to_string())
        })
    }
}

/// One-shot HTTP listener on the loopback interface.
#[derive(Debug)]
pub struct LoopbackListener {
    listener: TcpListener,
    redirect_uri: String,
}

impl LoopbackListener {
    /// Bind an ephemeral loopback port.
    pub async fn bind() -> Result<Self, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(|e| AuthError::InvalidToken(format!("Cannot bind redirect listener: {e}")))?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::InvalidToken(format!("Cannot bind redirect listener: {e}")))?
            .port();

        Ok(Self {
            listener,
            redirect_uri: format!("http://127.0.0.1:{port}"),
        })
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Wait for the authorization response and return the code.
    ///
    /// Requests without a query (favicon and the like) get a 404 and the
    /// listener keeps waiting.
    ///
    /// # Errors
    ///
    /// `AuthError::InvalidToken` on timeout or when the response is rejected.
    pub async fn wait_for_code(
        self,
        expected_state: &str,
        timeout: Duration,
    ) -> Result<String, AuthError> {
        tokio::time::timeout(timeout, self.accept_callback(expected_state))
            .await
            .map_err(|_| {
                AuthError::InvalidToken(format!(
                    "Timed out after {}s waiting for the browser sign-in",
                    timeout.as_secs()
                ))
            })?
    }

    async fn accept_callback(&self, expected_state: &str) -> Result<String, AuthError> {
        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .map_err(|e| AuthError::InvalidToken(format!("Redirect listener failed: {e}")))?;
            debug!(%peer, "Redirect connection");

            let mut stream = BufReader::new(stream);
            let target = match read_request_target(&mut stream).await {
                Ok(target) => target,
                Err(e) => {
                    warn!(error = %e, "Unreadable redirect request");
                    continue;
                }
            };

            let Some(params) = CallbackParams::from_target(&target) else {
                respond(stream.get_mut(), "404 Not Found", "").await;
                continue;
            };

            let outcome = params.into_code(expected_state);
            let page = if outcome.is_ok() { SUCCESS_PAGE } else { FAILURE_PAGE };
            respond(stream.get_mut(), "200 OK", page).await;
            return outcome;
        }
    }
}

/// Read the request line, skip the headers and return the request target.
async fn read_request_target(stream: &mut BufReader<TcpStream>) -> std::io::Result<String> {
    let mut request_line = String::new();
    stream.read_line(&mut request_line).await?;

    let mut header = String::new();
    loop {
        header.clear();
        let read = stream.read_line(&mut header).await?;
        if read == 0 || header.trim().is_empty() {
            break;
        }
    }

    let mut parts = request_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(_method), Some(target)) => Ok(target.to_string()),
        _ => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "malformed request line",
        )),
    }
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        debug!(error = %e, "Could not answer redirect request");
    }
    let _ = stream.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_without_query() {
        assert!(CallbackParams::from_target("/favicon.ico").is_none());
        assert!(CallbackParams::from_target("/?").is_none());
    }

    #[test]
    fn test_code_with_matching_state() {
        let params = CallbackParams::from_target("/?code=abc%2B1&state=s1").unwrap();
        assert_eq!(params.into_code("s1").unwrap(), "abc+1");
    }

    #[test]
    fn test_state_mismatch_rejected() {
        let params = CallbackParams::from_target("/?code=abc&state=other").unwrap();
        assert!(matches!(
            params.into_code("s1"),
            Err(AuthError::InvalidToken(msg)) if msg.contains("state mismatch")
        ));
    }

    #[test]
    fn test_provider_error_reported() {
        let params =
            CallbackParams::from_target("/?error=access_denied&error_description=User+cancelled")
                .unwrap();
        assert_eq!(
            params.into_code("s1"),
            Err(AuthError::InvalidToken(
                "Authorization failed: access_denied: User cancelled".to_string()
            ))
        );
    }

    #[test]
    fn test_missing_code_rejected() {
        let params = CallbackParams::from_target("/?state=s1").unwrap();
        assert!(params.into_code("s1").is_err());
    }

    #[tokio::test]
    async fn test_listener_receives_code() {
        let listener = LoopbackListener::bind().await.unwrap();
        let redirect = listener.redirect_uri().to_string();
        assert!(redirect.starts_with("http://127.0.0.1:"));

        let browser = tokio::spawn(async move {
            let client = reqwest::Client::new();
            let miss = client.get(format!("{redirect}/favicon.ico")).send().await.unwrap();
            assert_eq!(miss.status(), 404);
            let hit = client
                .get(format!("{redirect}/?code=the-code&state=s1"))
                .send()
                .await
                .unwrap();
            hit.text().await.unwrap()
        });

        let code = listener
            .wait_for_code("s1", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(code, "the-code");
        assert!(browser.await.unwrap().contains("Sign-in complete"));
    }

    #[tokio::test]
    async fn test_listener_times_out() {
        let listener = LoopbackListener::bind().await.unwrap();
        let err = listener
            .wait_for_code("s1", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(msg) if msg.contains("Timed out")));
    }
}
