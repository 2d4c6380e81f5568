//! System-user command - Headless sign-in and a proxy contact fetch

use super::CommandContext;
use crate::api::ProxyContactClient;
use crate::error::{CliError, CliResult};
use crate::system_user::SystemUserAcquirer;
use clap::Args;
use crmlink_session::{
    root_cause, CredentialAcquirer, ResourceClient, ResourceRequest, SessionError,
    SessionOrchestrator,
};
use std::io::Write;
use tracing::error;

/// Arguments for the system-user command
#[derive(Args, Debug, Default)]
pub struct SystemUserArgs {
    /// Contact to fetch (defaults to the ContactId setting)
    #[arg(long)]
    pub contact_id: Option<i32>,
}

/// Execute the system-user command
pub async fn execute(args: SystemUserArgs, ctx: &CommandContext) -> CliResult<()> {
    let settings = ctx.settings.system_user()?;
    let (runtime, http) = ctx.runtime()?;
    let contact_id = args.contact_id.unwrap_or(runtime.contact_id);

    let proxy = ProxyContactClient::new(http.clone(), settings.client_secret.as_str());
    let context_identifier = settings.context_identifier.clone();
    let mut orchestrator = ctx.orchestrator(SystemUserAcquirer::new(http, settings), &runtime);

    let mut out = std::io::stdout();
    run(
        &mut orchestrator,
        &proxy,
        contact_id,
        &context_identifier,
        &mut out,
    )
    .await
}

/// Authenticate, then fetch one contact through the proxy.
///
/// A failed fetch is reported against the configured tenant and does not
/// fail the command.
pub async fn run<A: CredentialAcquirer>(
    orchestrator: &mut SessionOrchestrator<A>,
    proxy: &dyn ResourceClient,
    contact_id: i32,
    context_identifier: &str,
    out: &mut dyn Write,
) -> CliResult<()> {
    orchestrator.authenticate().await?;
    writeln!(out, "Token is valid")?;

    let outcome = orchestrator
        .invoke(proxy, &ResourceRequest::contact(contact_id))
        .await;
    let result = match outcome {
        Ok(response) => {
            let (ctx, associate) = orchestrator
                .context()
                .map(|c| (c.context_identifier(), c.principal().unwrap_or("Unknown")))
                .unwrap_or((context_identifier, "Unknown"));
            writeln!(
                out,
                "Logged on to context {ctx} as {associate}, and fetched name for contactId with id {contact_id}: {}",
                response.display_name().unwrap_or_default()
            )?;
            Ok(())
        }
        Err(SessionError::Cancelled) => Err(CliError::Cancelled),
        Err(e) => {
            let root = root_cause(&e).to_string();
            error!(context_identifier, error = %root, "Contact fetch failed");
            writeln!(
                out,
                "Exception during authentication for customer {context_identifier}: {root}"
            )?;
            Ok(())
        }
    };

    orchestrator.logout();
    result
}
