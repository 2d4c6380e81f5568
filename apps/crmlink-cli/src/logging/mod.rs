//! Logging setup for the crmlink CLI
//!
//! Events go through `tracing` to a `tracing-subscriber` fmt layer on
//! stderr, so stdout carries only the menu and results. `RUST_LOG` wins
//! over the `-v` / `--debug` / `--trace` flags when set.

pub mod level;
pub mod redaction;

pub use level::LogLevel;
pub use redaction::{Redactor, REDACTED};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber for the given verbosity.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.filter_directive()))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(level.is_debug())
        .with_ansi(std::env::var("NO_COLOR").is_err());

    let _ = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init();
}
