//! Commit files to a GitHub branch through the Git Data API.
//!
//! [`commit_files`] resolves the branch, creates one blob per file, layers
//! them onto the current tree and moves the branch to a single new commit.
//! No local checkout is involved.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod commit;
pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod ports;

use clap::Parser;

pub use commit::{commit_files, CommitBuilder};
pub use error::CommitError;
pub use model::{
    CommitOptions, CommitOutcome, Encoding, ExistencePolicy, FileInput, RefUpdatePolicy, Stage,
};

/// Run the CLI with the provided arguments.
///
/// `--help` and `--version` print to stdout and count as success.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub async fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };
    commands::dispatch(&cli.command).await
}
