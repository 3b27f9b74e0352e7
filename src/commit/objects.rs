//! Tree and commit creation.

use super::remote::{decode, is_created, Remote};
use super::wire::{NewCommit, NewTree, NewTreeEntry, ShaBody, BLOB_TYPE, REGULAR_FILE_MODE};
use crate::error::CommitError;
use crate::model::{BlobRef, Stage};

impl Remote<'_> {
    /// Creates a tree that layers `blobs` over `base_tree`.
    ///
    /// Every entry is a regular file. Callers must not pass an empty list.
    pub(crate) async fn compose_tree(
        &self,
        base_tree: &str,
        blobs: &[BlobRef],
    ) -> Result<String, CommitError> {
        let stage = Stage::ComposingTree;
        let tree = NewTree {
            base_tree,
            tree: blobs
                .iter()
                .map(|blob| NewTreeEntry {
                    path: &blob.path,
                    mode: REGULAR_FILE_MODE,
                    kind: BLOB_TYPE,
                    sha: &blob.sha,
                })
                .collect(),
        };
        let response = self.post(self.repo_url("git/trees"), &tree, stage).await?;
        if !is_created(&response) {
            return Err(CommitError::TreeCreateFailed {
                status: response.status,
                body: response.body,
            });
        }
        let created: ShaBody = decode(response, stage)?;
        Ok(created.sha)
    }

    /// Creates a single-parent commit of `tree` on top of `parent`.
    pub(crate) async fn compose_commit(
        &self,
        message: &str,
        parent: &str,
        tree: &str,
    ) -> Result<String, CommitError> {
        let stage = Stage::ComposingCommit;
        let commit = NewCommit {
            message,
            parents: [parent],
            tree,
        };
        let response = self
            .post(self.repo_url("git/commits"), &commit, stage)
            .await?;
        if !is_created(&response) {
            return Err(CommitError::CommitCreateFailed {
                status: response.status,
                body: response.body,
            });
        }
        let created: ShaBody = decode(response, stage)?;
        Ok(created.sha)
    }
}
