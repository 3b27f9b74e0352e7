//! Command dispatch and handlers.

pub mod commit;

use crate::cli::Command;
use crate::config::Settings;
use crate::context::ServiceContext;

/// Dispatch a parsed command to its handler.
///
/// The transport is picked from the environment: `GHCOMMIT_REPLAY` serves
/// API responses from a cassette, `GHCOMMIT_RECORD` records live traffic to
/// one (tagged with the command's target), and otherwise requests go to
/// GitHub.
///
/// # Errors
///
/// Returns an error string if configuration is invalid or the command fails.
pub async fn dispatch(command: &Command) -> Result<(), String> {
    let settings = Settings::from_env()?;
    let ctx = ServiceContext::from_settings(&settings, &command.target())?;
    dispatch_with_context(command, &ctx).await
}

/// Dispatch a command with the given service context.
///
/// # Errors
///
/// Returns an error string if the command fails.
pub async fn dispatch_with_context(command: &Command, ctx: &ServiceContext) -> Result<(), String> {
    match command {
        Command::Commit(args) => commit::run(ctx, args).await,
    }
}
