//! Domain types shared by the commit pipeline and its callers.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::CommitError;

/// Commit message used when the caller does not supply one.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Test commit";

/// Root of the public GitHub REST API.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// How the contents of a [`FileInput`] are encoded on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    /// Plain UTF-8 text.
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
    /// Standard base64, used for binary content.
    #[serde(rename = "base64")]
    Base64,
}

impl Encoding {
    /// The name the Git Data API expects for this encoding.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Base64 => "base64",
        }
    }
}

/// One caller-supplied file to write into the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInput {
    /// Repository-relative path, `/`-separated.
    pub path: String,
    /// File contents, interpreted according to `encoding`.
    pub contents: String,
    /// Encoding of `contents`.
    #[serde(default)]
    pub encoding: Encoding,
}

impl FileInput {
    /// A UTF-8 text file.
    pub fn text(path: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
            encoding: Encoding::Utf8,
        }
    }

    /// A file whose raw bytes are sent base64-encoded.
    pub fn base64(path: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            path: path.into(),
            contents: STANDARD.encode(bytes),
            encoding: Encoding::Base64,
        }
    }

    /// Builds a file from raw bytes, falling back to base64 when they are not UTF-8.
    pub fn from_bytes(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Self::text(path, text),
            Err(err) => Self::base64(path, err.as_bytes()),
        }
    }

    /// Checks that `path` is a normalized repository-relative path.
    ///
    /// # Errors
    ///
    /// Returns [`CommitError::InvalidPath`] for empty or absolute paths and for
    /// paths with empty, `.` or `..` segments.
    pub fn validate(&self) -> Result<(), CommitError> {
        let reason = if self.path.is_empty() {
            Some("path is empty")
        } else if self.path.starts_with('/') {
            Some("path must be relative to the repository root")
        } else if self.path.split('/').any(str::is_empty) {
            Some("path contains an empty segment")
        } else if self.path.split('/').any(|segment| segment == "." || segment == "..") {
            Some("path contains a relative segment")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(CommitError::InvalidPath {
                path: self.path.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

/// Whether files already present on the branch are written again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExistencePolicy {
    /// Blob every input file without looking it up.
    #[default]
    AlwaysWrite,
    /// Look each path up first and skip the ones the branch already has.
    ///
    /// Any lookup answer other than 200, transport failures included, counts
    /// as "missing", so a file is never dropped because of a flaky lookup.
    SkipExisting,
}

/// How the branch reference is moved to the new commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefUpdatePolicy {
    /// Reject the update if the branch moved since it was resolved.
    FastForward,
    /// Overwrite the branch tip unconditionally (last writer wins).
    Force,
}

impl RefUpdatePolicy {
    /// Value of the `force` flag sent with the reference update.
    #[must_use]
    pub fn is_force(self) -> bool {
        matches!(self, Self::Force)
    }
}

/// Per-call knobs for [`crate::commit_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOptions {
    /// Commit message; [`DEFAULT_COMMIT_MESSAGE`] when `None`.
    pub message: Option<String>,
    /// Existence-check policy for the blob stage.
    pub existence: ExistencePolicy,
    /// Reference update policy. There is no default.
    pub ref_update: RefUpdatePolicy,
    /// Maximum number of in-flight lookup or blob requests.
    pub concurrency: usize,
    /// API root, e.g. `https://api.github.com` or a GitHub Enterprise URL.
    pub api_base: String,
}

impl CommitOptions {
    /// Options with the given reference policy and defaults for everything else.
    #[must_use]
    pub fn new(ref_update: RefUpdatePolicy) -> Self {
        Self {
            message: None,
            existence: ExistencePolicy::default(),
            ref_update,
            concurrency: 1,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Sets the commit message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the existence-check policy.
    #[must_use]
    pub fn existence(mut self, existence: ExistencePolicy) -> Self {
        self.existence = existence;
        self
    }

    /// Sets the blob-stage concurrency limit. Zero is treated as one.
    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Sets the API root.
    #[must_use]
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// The message that will be written into the commit.
    #[must_use]
    pub fn commit_message(&self) -> &str {
        self.message.as_deref().unwrap_or(DEFAULT_COMMIT_MESSAGE)
    }
}

/// Result of a successful [`crate::commit_files`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitOutcome {
    /// A new commit was created and the branch now points at it.
    Committed {
        /// Fully qualified reference name, e.g. `refs/heads/main`.
        ref_name: String,
        /// Id of the new commit.
        commit_id: String,
    },
    /// Nothing had to be written; the branch was left untouched.
    Unchanged,
}

impl CommitOutcome {
    /// `true` when a commit was added to the branch.
    #[must_use]
    pub fn added(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    /// Id of the new commit, if one was created.
    #[must_use]
    pub fn commit_id(&self) -> Option<&str> {
        match self {
            Self::Committed { commit_id, .. } => Some(commit_id),
            Self::Unchanged => None,
        }
    }
}

impl fmt::Display for CommitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Committed { ref_name, commit_id } => {
                write!(f, "Committed {commit_id} to {ref_name}")
            }
            Self::Unchanged => f.write_str("No changes to commit"),
        }
    }
}

/// A blob created for one input path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    /// Repository path the blob will be placed at.
    pub path: String,
    /// Id of the created blob.
    pub sha: String,
}

/// Pipeline states of the commit builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Checking input paths before any request.
    Validating,
    /// Reading the branch reference and its tip commit.
    ResolvingRef,
    /// Reading the tip commit's root tree.
    LoadingTree,
    /// Probing paths and creating blobs.
    Materializing,
    /// Creating the new tree.
    ComposingTree,
    /// Creating the new commit.
    ComposingCommit,
    /// Moving the branch reference.
    AdvancingRef,
    /// Finished, with or without a new commit.
    Done,
    /// Aborted by an error.
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validating => "validating input",
            Self::ResolvingRef => "resolving reference",
            Self::LoadingTree => "loading base tree",
            Self::Materializing => "creating blobs",
            Self::ComposingTree => "creating tree",
            Self::ComposingCommit => "creating commit",
            Self::AdvancingRef => "updating reference",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_nested_relative_paths() {
        for path in ["docs/guide/intro.md", ".github/workflows/ci.yml", "a.txt"] {
            assert!(FileInput::text(path, "").validate().is_ok(), "{path}");
        }
    }

    #[test]
    fn validate_rejects_malformed_paths() {
        for path in ["", "/etc/passwd", "a//b", "dir/", "./a.txt", "a/../b"] {
            let err = FileInput::text(path, "x").validate().unwrap_err();
            assert!(
                matches!(err, CommitError::InvalidPath { .. }),
                "expected InvalidPath for {path:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn from_bytes_falls_back_to_base64() {
        let text = FileInput::from_bytes("a.txt", b"hello".to_vec());
        assert_eq!(text.encoding, Encoding::Utf8);
        assert_eq!(text.contents, "hello");

        let binary = FileInput::from_bytes("logo.bin", vec![0xff, 0x00, 0x10]);
        assert_eq!(binary.encoding, Encoding::Base64);
        assert_eq!(binary.contents, "/wAQ");
    }

    #[test]
    fn options_default_message_and_concurrency_floor() {
        let options = CommitOptions::new(RefUpdatePolicy::FastForward)
            .concurrency(0);
        assert_eq!(options.commit_message(), DEFAULT_COMMIT_MESSAGE);
        assert_eq!(options.concurrency, 1);
        assert!(!options.ref_update.is_force());

        let options = options.message("Update docs");
        assert_eq!(options.commit_message(), "Update docs");
    }

    #[test]
    fn outcome_display_and_added_flag() {
        let committed = CommitOutcome::Committed {
            ref_name: "refs/heads/main".into(),
            commit_id: "c1".into(),
        };
        assert!(committed.added());
        assert_eq!(committed.commit_id(), Some("c1"));
        assert_eq!(committed.to_string(), "Committed c1 to refs/heads/main");

        assert!(!CommitOutcome::Unchanged.added());
        assert_eq!(CommitOutcome::Unchanged.to_string(), "No changes to commit");
    }
}
