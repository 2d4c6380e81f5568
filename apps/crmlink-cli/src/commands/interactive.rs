//! Interactive command - Browser sign-in followed by the menu

use super::CommandContext;
use crate::api::{ProxyContactClient, RestContactClient};
use crate::error::{CliError, CliResult};
use crate::oidc::{NoBrowser, OidcAcquirer, OidcOptions};
use crate::output::{format_token, write_header};
use crate::repl::{run_menu, CommandExecutor};
use clap::Args;
use crmlink_auth::Credential;
use crmlink_session::{CredentialAcquirer, ResourceRequest, SessionOrchestrator};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Arguments for the interactive command
#[derive(Args, Debug, Default)]
pub struct InteractiveArgs {
    /// Print the sign-in URL instead of opening a browser
    #[arg(long)]
    pub no_browser: bool,

    /// Print tokens in full instead of masking them
    #[arg(long)]
    pub show_tokens: bool,

    /// Contact to fetch (defaults to the ContactId setting)
    #[arg(long)]
    pub contact_id: Option<i32>,
}

/// Execute the interactive command
pub async fn execute(args: InteractiveArgs, ctx: &CommandContext) -> CliResult<()> {
    let settings = ctx.settings.interactive()?;
    let (runtime, http) = ctx.runtime()?;
    let contact_id = args.contact_id.unwrap_or(runtime.contact_id);

    let mut acquirer = OidcAcquirer::new(http.clone(), OidcOptions::from_settings(&settings));
    if args.no_browser {
        acquirer = acquirer.with_browser(NoBrowser);
    }
    let mut orchestrator = ctx.orchestrator(acquirer, &runtime);

    let rest = RestContactClient::new(http.clone());
    let proxy = ProxyContactClient::new(http, settings.client_secret.as_str());
    let executor = CommandExecutor::new(&rest, &proxy, ResourceRequest::contact(contact_id))
        .with_show_tokens(args.show_tokens);

    let mut input = BufReader::new(tokio::io::stdin());
    let mut out = std::io::stdout();
    run_session(
        &mut orchestrator,
        &executor,
        &mut input,
        &mut out,
        args.show_tokens,
    )
    .await
}

/// Sign in, show the result and run the menu until the user leaves.
///
/// The session is closed on every exit path.
pub async fn run_session<A, R>(
    orchestrator: &mut SessionOrchestrator<A>,
    executor: &CommandExecutor<'_>,
    input: &mut R,
    out: &mut dyn Write,
    show_tokens: bool,
) -> CliResult<()>
where
    A: CredentialAcquirer,
    R: AsyncBufRead + Unpin,
{
    write_header(out, "Sign in with OIDC")?;
    writeln!(out, "Press Enter to sign in...")?;
    out.flush()?;
    wait_for_enter(orchestrator, input).await?;

    let credential = orchestrator.authenticate().await?;
    show_result(&credential, show_tokens, out)?;

    let outcome = run_menu(executor, orchestrator, input, out).await;
    orchestrator.logout();
    outcome
}

async fn wait_for_enter<A, R>(orchestrator: &SessionOrchestrator<A>, input: &mut R) -> CliResult<()>
where
    A: CredentialAcquirer,
    R: AsyncBufRead + Unpin,
{
    let cancel = orchestrator.cancellation_token();
    let mut line = String::new();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CliError::Cancelled),
        read = input.read_line(&mut line) => {
            read?;
            Ok(())
        }
    }
}

/// Print the claims and tokens of a fresh sign-in.
pub fn show_result(credential: &Credential, show_tokens: bool, out: &mut dyn Write) -> CliResult<()> {
    writeln!(out, "\nClaims:")?;
    for (name, value) in credential.claims.iter() {
        writeln!(out, "{name}: {value}")?;
    }

    writeln!(
        out,
        "\nIdentity token: {}",
        format_token(credential.id_token.as_deref(), show_tokens)
    )?;
    writeln!(
        out,
        "Access token:   {}",
        format_token(Some(&credential.access_token), show_tokens)
    )?;
    writeln!(
        out,
        "Refresh token:  {}",
        format_token(credential.refresh_token(), show_tokens)
    )?;
    Ok(())
}
