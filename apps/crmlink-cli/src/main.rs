//! crmlink - Sign in to a CRM tenant and fetch contacts
//!
//! Two sign-in flows:
//! - Interactive OIDC sign-in in the browser, followed by a menu for REST
//!   and NetServer proxy calls and token refresh
//! - Headless system-user sign-in with a signed token exchange

use clap::{Parser, Subcommand};
use crmlink_cli::commands::{self, CommandContext};
use crmlink_cli::config::{Settings, SettingsPaths, SETTINGS_ENV_VAR};
use crmlink_cli::error::CliResult;
use crmlink_cli::logging::{init_logging, LogLevel};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// crmlink - CRM sign-in and contact lookup
#[derive(Parser)]
#[command(name = "crmlink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file (defaults to appsettings.json in the working directory)
    #[arg(long, global = true, env = SETTINGS_ENV_VAR)]
    settings: Option<PathBuf>,

    /// Show progress information
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Show HTTP exchanges
    #[arg(long, global = true)]
    debug: bool,

    /// Show redacted HTTP bodies
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with the browser and open the menu
    Interactive(commands::interactive::InteractiveArgs),

    /// Sign in as the system user and fetch a contact through the proxy
    SystemUser(commands::system_user::SystemUserArgs),

    /// Sign in as the system user and print the session context
    Claims(commands::claims::ClaimsArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(LogLevel::from_flags(cli.verbose, cli.debug, cli.trace));

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    match run(cli, cancel).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli, cancel: CancellationToken) -> CliResult<()> {
    let paths = SettingsPaths::resolve(cli.settings);
    let settings = Settings::load(&paths)?;
    let ctx = CommandContext::new(settings, cancel);

    match cli.command {
        Commands::Interactive(args) => commands::interactive::execute(args, &ctx).await,
        Commands::SystemUser(args) => commands::system_user::execute(args, &ctx).await,
        Commands::Claims(args) => commands::claims::execute(args, &ctx).await,
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            debug!("Ctrl-C received, cancelling");
            cancel.cancel();
        }
        Err(e) => warn!(error = %e, "Cannot listen for Ctrl-C"),
    }
}
