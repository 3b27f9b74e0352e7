//! Request plumbing shared by the pipeline stages.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use crate::error::CommitError;
use crate::model::Stage;
use crate::ports::http::{encode_path, HttpRequest, HttpResponse, HttpTransport};

/// One repository and branch on one API host, reached through a transport.
pub(crate) struct Remote<'a> {
    pub transport: &'a dyn HttpTransport,
    api_base: &'a str,
    pub repo: &'a str,
    pub branch: &'a str,
}

impl<'a> Remote<'a> {
    pub fn new(
        transport: &'a dyn HttpTransport,
        api_base: &'a str,
        repo: &'a str,
        branch: &'a str,
    ) -> Self {
        Self {
            transport,
            api_base: api_base.trim_end_matches('/'),
            repo,
            branch,
        }
    }

    /// `{api}/repos/{repo}/{tail}`
    pub fn repo_url(&self, tail: &str) -> String {
        format!("{}/repos/{}/{tail}", self.api_base, self.repo)
    }

    /// `{api}/repos/{repo}/git/refs/heads/{branch}`, with the branch escaped.
    pub fn branch_ref_url(&self) -> String {
        self.repo_url(&format!("git/refs/heads/{}", encode_path(self.branch)))
    }

    /// Fully qualified name of the branch reference.
    pub fn ref_name(&self) -> String {
        format!("refs/heads/{}", self.branch)
    }

    pub async fn send(
        &self,
        request: HttpRequest,
        stage: Stage,
    ) -> Result<HttpResponse, CommitError> {
        trace!(target: "ghcommit::http", method = ?request.method, url = %request.url, "request");
        let response = self
            .transport
            .send(&request)
            .await
            .map_err(|e| CommitError::Transport {
                stage,
                message: e.to_string(),
            })?;
        trace!(target: "ghcommit::http", status = response.status, url = %request.url, "response");
        Ok(response)
    }

    pub async fn get(&self, url: String, stage: Stage) -> Result<HttpResponse, CommitError> {
        self.send(HttpRequest::get(url), stage).await
    }

    pub async fn post<B: Serialize>(
        &self,
        url: String,
        body: &B,
        stage: Stage,
    ) -> Result<HttpResponse, CommitError> {
        let body = encode(body, stage)?;
        self.send(HttpRequest::post(url, body), stage).await
    }

    pub async fn patch<B: Serialize>(
        &self,
        url: String,
        body: &B,
        stage: Stage,
    ) -> Result<HttpResponse, CommitError> {
        let body = encode(body, stage)?;
        self.send(HttpRequest::patch(url, body), stage).await
    }
}

/// Reads for existing objects only accept `200`.
pub(crate) fn is_found(response: &HttpResponse) -> bool {
    response.status == 200
}

/// Object creation and ref updates accept `200` or `201`.
pub(crate) fn is_created(response: &HttpResponse) -> bool {
    matches!(response.status, 200 | 201)
}

/// Decodes a successful response body.
pub(crate) fn decode<T: DeserializeOwned>(
    response: HttpResponse,
    stage: Stage,
) -> Result<T, CommitError> {
    serde_json::from_value(response.body).map_err(|e| CommitError::UnexpectedResponse {
        stage,
        message: e.to_string(),
    })
}

fn encode<B: Serialize>(body: &B, stage: Stage) -> Result<Value, CommitError> {
    serde_json::to_value(body).map_err(|e| CommitError::UnexpectedResponse {
        stage,
        message: format!("failed to encode request body: {e}"),
    })
}
