//! crmlink CLI library
//!
//! The binary in main.rs is a thin clap front end over these modules; they
//! are public so the integration tests can drive them directly.

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod oidc;
pub mod output;
pub mod repl;
pub mod system_user;
