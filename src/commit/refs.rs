//! Reference resolution, base tree loading and reference advancement.

use tracing::debug;

use super::remote::{decode, is_created, is_found, Remote};
use super::wire::{CommitBody, RefBody, RefUpdate, ShaBody};
use crate::error::CommitError;
use crate::model::{RefUpdatePolicy, Stage};

/// The branch tip as seen at the start of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Tip {
    /// Commit the branch points at.
    pub commit: String,
    /// API URL of that commit's root tree.
    pub tree_url: String,
}

/// The reference after a successful update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RefState {
    pub name: String,
    pub object_id: String,
}

impl Remote<'_> {
    /// Reads the branch reference, then the commit it points at.
    pub(crate) async fn resolve_tip(&self) -> Result<Tip, CommitError> {
        let stage = Stage::ResolvingRef;
        let response = self.get(self.branch_ref_url(), stage).await?;
        if !is_found(&response) {
            return Err(self.not_found(response.status, response.body));
        }
        let reference: RefBody = decode(response, stage)?;
        let commit_url = reference.object.url.ok_or_else(|| CommitError::UnexpectedResponse {
            stage,
            message: format!("{} has no object url", reference.name),
        })?;

        let response = self.get(commit_url, stage).await?;
        if !is_found(&response) {
            return Err(self.not_found(response.status, response.body));
        }
        let commit: CommitBody = decode(response, stage)?;
        let tree_url = commit.tree.url.ok_or_else(|| CommitError::UnexpectedResponse {
            stage,
            message: format!("commit {} has no tree url", commit.sha),
        })?;

        debug!(
            target: "ghcommit",
            branch = self.branch,
            tip = %commit.sha,
            "resolved branch tip"
        );
        Ok(Tip {
            commit: commit.sha,
            tree_url,
        })
    }

    /// Reads the root tree and returns its own id.
    pub(crate) async fn load_base_tree(&self, tip: &Tip) -> Result<String, CommitError> {
        let stage = Stage::LoadingTree;
        let response = self.get(tip.tree_url.clone(), stage).await?;
        if !is_found(&response) {
            return Err(CommitError::TreeLoadFailed {
                status: response.status,
                body: response.body,
            });
        }
        let tree: ShaBody = decode(response, stage)?;
        Ok(tree.sha)
    }

    /// Points the branch at `commit`.
    pub(crate) async fn advance_ref(
        &self,
        commit: &str,
        policy: RefUpdatePolicy,
    ) -> Result<RefState, CommitError> {
        let stage = Stage::AdvancingRef;
        let update = RefUpdate {
            sha: commit,
            force: policy.is_force(),
        };
        let response = self.patch(self.branch_ref_url(), &update, stage).await?;
        if !is_created(&response) {
            return Err(CommitError::RefUpdateFailed {
                ref_name: self.ref_name(),
                status: response.status,
                body: response.body,
            });
        }
        let reference: RefBody = decode(response, stage)?;
        Ok(RefState {
            name: reference.name,
            object_id: reference.object.sha,
        })
    }

    fn not_found(&self, status: u16, body: serde_json::Value) -> CommitError {
        CommitError::ReferenceNotFound {
            branch: self.branch.to_string(),
            status,
            body,
        }
    }
}
