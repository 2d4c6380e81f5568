//! The menu loop

use super::command::MENU;
use super::executor::{CommandExecutor, ExecuteResult};
use crate::error::{CliError, CliResult};
use crate::output::write_success;
use crmlink_session::{CredentialAcquirer, SessionOrchestrator};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

/// Write the menu.
pub fn write_menu(out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "\nChoose an option:")?;
    for entry in &MENU {
        writeln!(out, "{}: {}", entry.key, entry.label)?;
    }
    out.flush()
}

/// Show the menu and run choices until exit, end of input or cancellation.
///
/// A choice that ends the session is followed by a fresh sign-in before the
/// menu is shown again.
///
/// # Errors
///
/// `CliError::Cancelled` when the orchestrator's cancellation token fires,
/// `CliError::Io` when input or output fails, and the sign-in error when
/// signing in again fails.
pub async fn run_menu<A, R>(
    executor: &CommandExecutor<'_>,
    orchestrator: &mut SessionOrchestrator<A>,
    input: &mut R,
    out: &mut dyn Write,
) -> CliResult<()>
where
    A: CredentialAcquirer,
    R: AsyncBufRead + Unpin,
{
    let cancel = orchestrator.cancellation_token();

    loop {
        write_menu(out)?;

        let mut line = String::new();
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CliError::Cancelled),
            read = input.read_line(&mut line) => read?,
        };
        if read == 0 {
            debug!("Input closed, leaving menu");
            return Ok(());
        }

        match executor.execute(&line, orchestrator, out).await? {
            ExecuteResult::Exit => return Ok(()),
            ExecuteResult::Continue | ExecuteResult::Empty => {}
        }

        if !orchestrator.is_authenticated() {
            sign_in_again(orchestrator, out).await?;
        }
    }
}

async fn sign_in_again<A: CredentialAcquirer>(
    orchestrator: &mut SessionOrchestrator<A>,
    out: &mut dyn Write,
) -> CliResult<()> {
    info!("Session ended, signing in again");
    writeln!(out, "Signing in again...")?;
    out.flush()?;
    orchestrator.authenticate().await?;
    write_success(out, "Signed in again.")?;
    Ok(())
}
