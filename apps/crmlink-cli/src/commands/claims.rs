//! Claims command - Show the session context of the system user

use super::CommandContext;
use crate::error::{CliError, CliResult};
use crate::output::{format_token, write_header, write_key_value};
use crate::system_user::SystemUserAcquirer;
use clap::Args;
use crmlink_session::{CredentialAcquirer, SessionOrchestrator};
use std::io::Write;

/// Arguments for the claims command
#[derive(Args, Debug, Default)]
pub struct ClaimsArgs {
    /// Print the ticket in full instead of masking it
    #[arg(long)]
    pub show_tokens: bool,
}

/// Execute the claims command
pub async fn execute(args: ClaimsArgs, ctx: &CommandContext) -> CliResult<()> {
    let settings = ctx.settings.system_user()?;
    let (runtime, http) = ctx.runtime()?;
    let mut orchestrator = ctx.orchestrator(SystemUserAcquirer::new(http, settings), &runtime);

    let mut out = std::io::stdout();
    run(&mut orchestrator, args.show_tokens, &mut out).await
}

/// Authenticate and print the derived session context.
pub async fn run<A: CredentialAcquirer>(
    orchestrator: &mut SessionOrchestrator<A>,
    show_tokens: bool,
    out: &mut dyn Write,
) -> CliResult<()> {
    let credential = orchestrator.authenticate().await?;
    let context = orchestrator.context().ok_or(CliError::NotAuthenticated)?;

    write_header(out, "Session context")?;
    write_key_value(out, "Context identifier", context.context_identifier())?;
    write_key_value(out, "Principal", context.principal().unwrap_or("Unknown"))?;
    write_key_value(out, "Web API URL", context.webapi_url())?;
    write_key_value(out, "NetServer URL", context.netserver_url())?;
    write_key_value(out, "Ticket", &format_token(Some(context.ticket()), show_tokens))?;
    write_key_value(out, "Expires at", &credential.expires_at.to_rfc3339())?;
    writeln!(out)?;

    orchestrator.logout();
    Ok(())
}
