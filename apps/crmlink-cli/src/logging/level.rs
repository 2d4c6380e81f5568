//! Verbosity flags and the tracing filter each one selects

use std::fmt;

/// Verbosity chosen on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Warnings and errors only (default)
    #[default]
    Normal = 0,
    /// Progress of each session step
    Verbose = 1,
    /// HTTP requests and session state changes
    Debug = 2,
    /// Everything, including dependency crates
    Trace = 3,
}

impl LogLevel {
    /// Create LogLevel from CLI flags
    ///
    /// Order of precedence: trace > debug > verbose > normal
    pub fn from_flags(verbose: bool, debug: bool, trace: bool) -> Self {
        if trace {
            Self::Trace
        } else if debug {
            Self::Debug
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    pub fn is_debug(&self) -> bool {
        *self >= Self::Debug
    }

    /// `EnvFilter` directive for this level
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Self::Normal => "warn",
            Self::Verbose => "warn,crmlink_cli=info,crmlink_session=info,crmlink_auth=info",
            Self::Debug => "info,crmlink_cli=debug,crmlink_session=debug,crmlink_auth=debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::Verbose => "verbose",
            Self::Debug => "debug",
            Self::Trace => "trace",
        })
    }
}
