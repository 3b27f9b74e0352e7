//! Error taxonomy for the commit pipeline.

use serde_json::Value;
use thiserror::Error;

use crate::model::Stage;

/// Why a commit pipeline aborted.
///
/// Remote failures carry the HTTP status and the response body the API sent
/// back (`Value::Null` when there was none). None of them are retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommitError {
    /// The branch reference or its tip commit could not be read.
    #[error("reference refs/heads/{branch} not found (status {status}){}", detail(.body))]
    ReferenceNotFound {
        /// Branch that was looked up.
        branch: String,
        /// Status of the failed lookup.
        status: u16,
        /// Remote error body.
        body: Value,
    },
    /// The tip commit's root tree could not be read.
    #[error("failed to load base tree (status {status}){}", detail(.body))]
    TreeLoadFailed {
        /// Status of the failed lookup.
        status: u16,
        /// Remote error body.
        body: Value,
    },
    /// A blob could not be created.
    #[error("failed to create blob for {path} (status {status}){}", detail(.body))]
    BlobCreateFailed {
        /// Path of the file whose blob failed.
        path: String,
        /// Status of the failed request.
        status: u16,
        /// Remote error body.
        body: Value,
    },
    /// The new tree could not be created.
    #[error("failed to create tree (status {status}){}", detail(.body))]
    TreeCreateFailed {
        /// Status of the failed request.
        status: u16,
        /// Remote error body.
        body: Value,
    },
    /// The new commit could not be created.
    #[error("failed to create commit (status {status}){}", detail(.body))]
    CommitCreateFailed {
        /// Status of the failed request.
        status: u16,
        /// Remote error body.
        body: Value,
    },
    /// The branch could not be moved to the new commit.
    ///
    /// With a fast-forward policy this is how a concurrent writer shows up.
    #[error("failed to update {ref_name} (status {status}){}", detail(.body))]
    RefUpdateFailed {
        /// Reference that was being updated.
        ref_name: String,
        /// Status of the failed request.
        status: u16,
        /// Remote error body.
        body: Value,
    },
    /// An input path was rejected before any request was made.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// The request never produced an HTTP response.
    #[error("transport error while {stage}: {message}")]
    Transport {
        /// Stage that issued the request.
        stage: Stage,
        /// Transport error text.
        message: String,
    },
    /// A successful response was missing a field the pipeline needs.
    #[error("unexpected response while {stage}: {message}")]
    UnexpectedResponse {
        /// Stage that issued the request.
        stage: Stage,
        /// What could not be decoded.
        message: String,
    },
}

impl CommitError {
    /// The pipeline stage the error was raised in.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::InvalidPath { .. } => Stage::Validating,
            Self::ReferenceNotFound { .. } => Stage::ResolvingRef,
            Self::TreeLoadFailed { .. } => Stage::LoadingTree,
            Self::BlobCreateFailed { .. } => Stage::Materializing,
            Self::TreeCreateFailed { .. } => Stage::ComposingTree,
            Self::CommitCreateFailed { .. } => Stage::ComposingCommit,
            Self::RefUpdateFailed { .. } => Stage::AdvancingRef,
            Self::Transport { stage, .. } | Self::UnexpectedResponse { stage, .. } => *stage,
        }
    }

    /// HTTP status of the failed remote call, if there was one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ReferenceNotFound { status, .. }
            | Self::TreeLoadFailed { status, .. }
            | Self::BlobCreateFailed { status, .. }
            | Self::TreeCreateFailed { status, .. }
            | Self::CommitCreateFailed { status, .. }
            | Self::RefUpdateFailed { status, .. } => Some(*status),
            Self::InvalidPath { .. } | Self::Transport { .. } | Self::UnexpectedResponse { .. } => {
                None
            }
        }
    }
}

/// Renders the `message` of a GitHub error body, or the whole body otherwise.
fn detail(body: &Value) -> String {
    match body {
        Value::Null => String::new(),
        Value::Object(map) => match map.get("message").and_then(Value::as_str) {
            Some(message) => format!(": {message}"),
            None => format!(": {body}"),
        },
        other => format!(": {other}"),
    }
}
