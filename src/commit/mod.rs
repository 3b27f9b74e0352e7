//! The commit builder: turns a list of files into one commit on a branch.
//!
//! The pipeline is strictly sequential:
//!
//! ```text
//! Validating -> ResolvingRef -> LoadingTree -> Materializing
//!            -> ComposingTree -> ComposingCommit -> AdvancingRef -> Done
//! ```
//!
//! Any stage may end in `Failed`. The only other branch is the no-op exit
//! after `Materializing` when no blob had to be created.

mod blobs;
mod objects;
mod refs;
mod remote;
mod wire;

use tracing::{debug, info, warn};

use crate::error::CommitError;
use crate::model::{CommitOptions, CommitOutcome, FileInput, Stage};
use crate::ports::http::HttpTransport;
use remote::Remote;

/// Commits `files` to `branch` of `repo` (`owner/name`) in a single commit.
///
/// # Errors
///
/// Returns the [`CommitError`] of the first stage that failed. Objects created
/// before the failure are left in the remote store unreferenced.
pub async fn commit_files(
    transport: &dyn HttpTransport,
    repo: &str,
    branch: &str,
    files: &[FileInput],
    options: &CommitOptions,
) -> Result<CommitOutcome, CommitError> {
    let mut builder = CommitBuilder::new(transport, repo, branch, options);
    builder.run(files).await
}

/// Drives one run of the pipeline and tracks the current [`Stage`].
pub struct CommitBuilder<'a> {
    remote: Remote<'a>,
    options: &'a CommitOptions,
    stage: Stage,
}

impl<'a> CommitBuilder<'a> {
    /// Creates a builder for one branch.
    #[must_use]
    pub fn new(
        transport: &'a dyn HttpTransport,
        repo: &'a str,
        branch: &'a str,
        options: &'a CommitOptions,
    ) -> Self {
        Self {
            remote: Remote::new(transport, &options.api_base, repo, branch),
            options,
            stage: Stage::Validating,
        }
    }

    /// The stage the builder is in (or finished in).
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Runs the pipeline to completion.
    ///
    /// # Errors
    ///
    /// See [`commit_files`].
    pub async fn run(&mut self, files: &[FileInput]) -> Result<CommitOutcome, CommitError> {
        let result = self.drive(files).await;
        match &result {
            Ok(outcome) => {
                self.enter(Stage::Done);
                info!(
                    target: "ghcommit",
                    repo = self.remote.repo,
                    branch = self.remote.branch,
                    "{outcome}"
                );
            }
            Err(err) => {
                self.enter(Stage::Failed);
                warn!(
                    target: "ghcommit",
                    repo = self.remote.repo,
                    branch = self.remote.branch,
                    stage = %err.stage(),
                    "commit failed: {err}"
                );
            }
        }
        result
    }

    async fn drive(&mut self, files: &[FileInput]) -> Result<CommitOutcome, CommitError> {
        for file in files {
            file.validate()?;
        }

        self.enter(Stage::ResolvingRef);
        let tip = self.remote.resolve_tip().await?;

        self.enter(Stage::LoadingTree);
        let base_tree = self.remote.load_base_tree(&tip).await?;

        self.enter(Stage::Materializing);
        let blobs = self
            .remote
            .materialize(files, self.options.existence, self.options.concurrency)
            .await?;
        if blobs.is_empty() {
            return Ok(CommitOutcome::Unchanged);
        }

        self.enter(Stage::ComposingTree);
        let tree = self.remote.compose_tree(&base_tree, &blobs).await?;

        self.enter(Stage::ComposingCommit);
        let commit = self
            .remote
            .compose_commit(self.options.commit_message(), &tip.commit, &tree)
            .await?;

        self.enter(Stage::AdvancingRef);
        let reference = self
            .remote
            .advance_ref(&commit, self.options.ref_update)
            .await?;

        Ok(CommitOutcome::Committed {
            ref_name: reference.name,
            commit_id: reference.object_id,
        })
    }

    fn enter(&mut self, stage: Stage) {
        debug!(target: "ghcommit", from = %self.stage, to = %stage, "stage transition");
        self.stage = stage;
    }
}
