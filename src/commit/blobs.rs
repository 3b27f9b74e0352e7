//! Existence lookups and blob creation.

use futures_util::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use super::remote::{decode, is_created, is_found, Remote};
use super::wire::{NewBlob, ShaBody};
use crate::error::CommitError;
use crate::model::{BlobRef, ExistencePolicy, FileInput, Stage};
use crate::ports::http::{encode_path, HttpRequest};

impl Remote<'_> {
    /// Creates blobs for every file that needs writing.
    ///
    /// Returns `(path, sha)` pairs in input order. An empty result means
    /// nothing has to be committed. At most `concurrency` requests are in
    /// flight; the first failed blob aborts the rest.
    pub(crate) async fn materialize(
        &self,
        files: &[FileInput],
        existence: ExistencePolicy,
        concurrency: usize,
    ) -> Result<Vec<BlobRef>, CommitError> {
        let limit = concurrency.max(1);
        let pending = match existence {
            ExistencePolicy::AlwaysWrite => files.iter().collect::<Vec<_>>(),
            ExistencePolicy::SkipExisting => self.missing_files(files, limit).await,
        };

        if pending.is_empty() {
            return Ok(Vec::new());
        }

        stream::iter(pending)
            .map(|file| self.create_blob(file))
            .buffered(limit)
            .try_collect()
            .await
    }

    /// Files whose path the branch does not have yet.
    async fn missing_files<'f>(&self, files: &'f [FileInput], limit: usize) -> Vec<&'f FileInput> {
        let present: Vec<bool> = stream::iter(files)
            .map(|file| self.exists(&file.path))
            .buffered(limit)
            .collect()
            .await;

        files
            .iter()
            .zip(present)
            .filter_map(|(file, present)| {
                if present {
                    debug!(target: "ghcommit", path = %file.path, "already present, skipping");
                    None
                } else {
                    Some(file)
                }
            })
            .collect()
    }

    /// Looks `path` up on the branch through the contents endpoint.
    ///
    /// Only a 200 counts as present. Other statuses and transport errors
    /// count as missing.
    async fn exists(&self, path: &str) -> bool {
        let url = self.repo_url(&format!(
            "contents/{}?ref={}",
            encode_path(path),
            urlencoding::encode(self.branch)
        ));
        match self.transport.send(&HttpRequest::get(url)).await {
            Ok(response) => is_found(&response),
            Err(err) => {
                debug!(
                    target: "ghcommit",
                    %path,
                    error = %err,
                    "lookup failed, treating as missing"
                );
                false
            }
        }
    }

    async fn create_blob(&self, file: &FileInput) -> Result<BlobRef, CommitError> {
        let stage = Stage::Materializing;
        let blob = NewBlob {
            content: &file.contents,
            encoding: file.encoding,
        };
        let response = self.post(self.repo_url("git/blobs"), &blob, stage).await?;
        if !is_created(&response) {
            return Err(CommitError::BlobCreateFailed {
                path: file.path.clone(),
                status: response.status,
                body: response.body,
            });
        }
        let created: ShaBody = decode(response, stage)?;
        debug!(target: "ghcommit", path = %file.path, sha = %created.sha, "created blob");
        Ok(BlobRef {
            path: file.path.clone(),
            sha: created.sha,
        })
    }
}
