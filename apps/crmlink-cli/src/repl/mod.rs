//! Post-sign-in console menu
//!
//! Choices map to [`MenuCommand`]s through the static [`MENU`] table and
//! run against the active session. The loop reads from any
//! `AsyncBufRead` and writes to any `Write`.

mod command;
mod executor;
mod menu;

pub use command::{MenuCommand, MenuEntry, MENU};
pub use executor::{CommandExecutor, ExecuteResult};
pub use menu::{run_menu, write_menu};
