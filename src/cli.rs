//! CLI argument definitions.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::model::{CommitOptions, ExistencePolicy, RefUpdatePolicy, DEFAULT_API_BASE};

/// Top-level CLI parser for `ghcommit`.
#[derive(Debug, Parser)]
#[command(
    name = "ghcommit",
    version,
    about = "Commit files to a GitHub branch without a local checkout"
)]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write local files to a branch as a single commit.
    Commit(CommitArgs),
}

impl Command {
    /// The `owner/name@branch` the command writes to.
    #[must_use]
    pub fn target(&self) -> String {
        match self {
            Self::Commit(args) => format!("{}@{}", args.repo, args.branch),
        }
    }
}

/// Arguments of `ghcommit commit`.
#[derive(Debug, Args)]
#[command(group(ArgGroup::new("ref_update").required(true).args(["fast_forward", "force"])))]
pub struct CommitArgs {
    /// Repository as `owner/name`.
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repo: String,

    /// Branch to commit to.
    #[arg(long, env = "GHCOMMIT_BRANCH")]
    pub branch: String,

    /// Commit message.
    #[arg(short, long)]
    pub message: Option<String>,

    /// Skip files that already exist on the branch.
    #[arg(long)]
    pub skip_existing: bool,

    /// Refuse to move the branch if someone else pushed in the meantime.
    #[arg(long)]
    pub fast_forward: bool,

    /// Move the branch even if that discards concurrent commits.
    #[arg(long)]
    pub force: bool,

    /// Send every file base64-encoded, even when it is valid UTF-8.
    #[arg(long)]
    pub base64: bool,

    /// Maximum number of blob requests in flight.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,

    /// API root, for GitHub Enterprise.
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_BASE)]
    pub api_url: String,

    /// Files as `LOCAL[=REMOTE]`; REMOTE defaults to LOCAL.
    #[arg(required = true, value_name = "LOCAL[=REMOTE]")]
    pub files: Vec<FileSpec>,
}

impl CommitArgs {
    /// Pipeline options selected by the flags.
    #[must_use]
    pub fn options(&self) -> CommitOptions {
        let ref_update = if self.force {
            RefUpdatePolicy::Force
        } else {
            RefUpdatePolicy::FastForward
        };
        let existence = if self.skip_existing {
            ExistencePolicy::SkipExisting
        } else {
            ExistencePolicy::AlwaysWrite
        };
        let mut options = CommitOptions::new(ref_update)
            .existence(existence)
            .concurrency(usize::from(self.concurrency))
            .api_base(self.api_url.clone());
        if let Some(message) = &self.message {
            options = options.message(message.clone());
        }
        options
    }
}

/// A local file and the repository path it is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    /// File on disk.
    pub local: PathBuf,
    /// Repository-relative destination, `/`-separated.
    pub remote: String,
}

impl FromStr for FileSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (local, remote) = match s.split_once('=') {
            Some((local, remote)) => (local, remote),
            None => (s, s),
        };
        if local.is_empty() {
            return Err(format!("missing local path in {s:?}"));
        }
        if remote.is_empty() {
            return Err(format!("missing repository path in {s:?}"));
        }
        let remote = remote.replace('\\', "/");
        let remote = remote.strip_prefix("./").unwrap_or(&remote).to_string();
        Ok(Self {
            local: PathBuf::from(local),
            remote,
        })
    }
}
