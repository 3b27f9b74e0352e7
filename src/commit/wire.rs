//! Request and response bodies of the Git Data API.

use serde::{Deserialize, Serialize};

use crate::model::Encoding;

/// File mode of a regular, non-executable file.
pub(crate) const REGULAR_FILE_MODE: &str = "100644";

/// Tree entry type for file content.
pub(crate) const BLOB_TYPE: &str = "blob";

/// Pointer to another object, as embedded in refs and commits.
#[derive(Debug, Deserialize)]
pub(crate) struct ObjectLink {
    pub sha: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// `GET /git/refs/heads/{branch}` and `PATCH` of the same.
#[derive(Debug, Deserialize)]
pub(crate) struct RefBody {
    #[serde(rename = "ref")]
    pub name: String,
    pub object: ObjectLink,
}

/// `GET /git/commits/{sha}`.
#[derive(Debug, Deserialize)]
pub(crate) struct CommitBody {
    pub sha: String,
    pub tree: ObjectLink,
}

/// Any created or fetched object, when only its id matters.
#[derive(Debug, Deserialize)]
pub(crate) struct ShaBody {
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewBlob<'a> {
    pub content: &'a str,
    pub encoding: Encoding,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewTreeEntry<'a> {
    pub path: &'a str,
    pub mode: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub sha: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewTree<'a> {
    pub base_tree: &'a str,
    pub tree: Vec<NewTreeEntry<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewCommit<'a> {
    pub message: &'a str,
    pub parents: [&'a str; 1],
    pub tree: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefUpdate<'a> {
    pub sha: &'a str,
    pub force: bool,
}
