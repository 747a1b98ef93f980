//! Command dispatch and handlers.

pub mod check;
pub mod sync;

use crate::cli::Command;

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    match command {
        Command::Sync(args) => sync::run(args),
        Command::Check { config } => check::run(config.as_deref()),
    }
}
