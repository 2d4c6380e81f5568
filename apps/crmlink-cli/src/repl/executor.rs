//! Command execution for the post-sign-in menu
//!
//! Invocation and refresh failures are reported on the console and the
//! menu keeps running. Only cancellation and broken output end it.

use super::command::MenuCommand;
use crate::error::{CliError, CliResult};
use crate::output::{format_token, write_success, write_warning};
use crmlink_auth::AuthError;
use crmlink_session::{
    root_cause, CredentialAcquirer, ResourceClient, ResourceRequest, ResourceResponse,
    SessionError, SessionOrchestrator,
};
use std::io::Write;
use tracing::{error, warn};

/// Result of executing one menu choice
#[derive(Debug, PartialEq, Eq)]
pub enum ExecuteResult {
    /// Command ran, show the menu again
    Continue,
    /// User chose to exit
    Exit,
    /// Empty input
    Empty,
}

/// Runs menu choices against the session.
pub struct CommandExecutor<'a> {
    rest: &'a dyn ResourceClient,
    proxy: &'a dyn ResourceClient,
    request: ResourceRequest,
    show_tokens: bool,
}

impl<'a> CommandExecutor<'a> {
    pub fn new(
        rest: &'a dyn ResourceClient,
        proxy: &'a dyn ResourceClient,
        request: ResourceRequest,
    ) -> Self {
        Self {
            rest,
            proxy,
            request,
            show_tokens: false,
        }
    }

    #[must_use]
    pub fn with_show_tokens(mut self, show_tokens: bool) -> Self {
        self.show_tokens = show_tokens;
        self
    }

    /// Execute one line typed at the menu.
    ///
    /// # Errors
    ///
    /// `CliError::Cancelled` when the session was cancelled, `CliError::Io`
    /// when the output cannot be written.
    pub async fn execute<A: CredentialAcquirer>(
        &self,
        line: &str,
        orchestrator: &mut SessionOrchestrator<A>,
        out: &mut dyn Write,
    ) -> CliResult<ExecuteResult> {
        let choice = line.trim();
        if choice.is_empty() {
            return Ok(ExecuteResult::Empty);
        }

        let Some(command) = MenuCommand::parse(choice) else {
            warn!(choice, "Invalid choice");
            return Ok(ExecuteResult::Continue);
        };

        match command {
            MenuCommand::CallRest => self.call_rest(orchestrator, out).await?,
            MenuCommand::CallProxy => self.call_proxy(orchestrator, out).await?,
            MenuCommand::Refresh => self.refresh(orchestrator, out).await?,
            MenuCommand::Exit => return Ok(ExecuteResult::Exit),
        }
        Ok(ExecuteResult::Continue)
    }

    async fn call_rest<A: CredentialAcquirer>(
        &self,
        orchestrator: &mut SessionOrchestrator<A>,
        out: &mut dyn Write,
    ) -> CliResult<()> {
        match orchestrator.invoke(self.rest, &self.request).await {
            Ok(ResourceResponse::Json(body)) => {
                let pretty = serde_json::to_string_pretty(&body)?;
                writeln!(out, "API response:\n{pretty}")?;
            }
            Ok(ResourceResponse::Contact(contact)) => {
                writeln!(out, "API response:\n{}", serde_json::to_string_pretty(&contact)?)?;
            }
            Err(SessionError::Cancelled) => return Err(CliError::Cancelled),
            Err(e) => write_warning(out, &format!("REST call failed: {}", root_message(&e)))?,
        }
        Ok(())
    }

    async fn call_proxy<A: CredentialAcquirer>(
        &self,
        orchestrator: &mut SessionOrchestrator<A>,
        out: &mut dyn Write,
    ) -> CliResult<()> {
        let ResourceRequest::Contact { id } = self.request;
        // The invocation may end the session, so keep the tenant for the failure line.
        let known_context = orchestrator
            .context()
            .map(|c| c.context_identifier().to_string());
        match orchestrator.invoke(self.proxy, &self.request).await {
            Ok(response) => {
                let (context_identifier, associate) = orchestrator
                    .context()
                    .map(|c| (c.context_identifier(), c.principal().unwrap_or("Unknown")))
                    .unwrap_or(("unknown", "Unknown"));
                writeln!(
                    out,
                    "Logged on to context {context_identifier} as {associate}, and fetched name for contactId with id {id}: {}",
                    response.display_name().unwrap_or_default()
                )?;
            }
            Err(SessionError::Cancelled) => return Err(CliError::Cancelled),
            Err(e) => {
                let context_identifier = known_context.as_deref().unwrap_or("unknown");
                writeln!(
                    out,
                    "Exception during authentication for customer {context_identifier}: {}",
                    root_message(&e)
                )?;
            }
        }
        Ok(())
    }

    async fn refresh<A: CredentialAcquirer>(
        &self,
        orchestrator: &mut SessionOrchestrator<A>,
        out: &mut dyn Write,
    ) -> CliResult<()> {
        match orchestrator.refresh().await {
            Ok(credential) => {
                write_success(out, "Tokens refreshed successfully!")?;
                writeln!(
                    out,
                    "access token:   {}",
                    format_token(Some(&credential.access_token), self.show_tokens)
                )?;
                writeln!(
                    out,
                    "refresh token:  {}",
                    format_token(credential.refresh_token(), self.show_tokens)
                )?;
            }
            Err(SessionError::Auth(AuthError::NoRefreshToken)) => {
                writeln!(out, "No refresh token available.")?;
            }
            Err(SessionError::Cancelled) => return Err(CliError::Cancelled),
            Err(e) => {
                error!(error = %e, "Token refresh failed");
                write_warning(out, "Token refresh failed")?;
                if !orchestrator.is_authenticated() {
                    write_warning(out, "The session has ended.")?;
                }
            }
        }
        Ok(())
    }
}

fn root_message(e: &SessionError) -> String {
    root_cause(e).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_message_of_invocation_error() {
        let err: SessionError =
            crmlink_session::InvocationError::rpc_message("Contact 5 not found").into();
        assert_eq!(root_message(&err), "RPC failure: Contact 5 not found");
    }
}
