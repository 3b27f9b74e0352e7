//! HTTP port for talking to the GitHub REST API.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error type returned when a request never produced a response.
pub type TransportError = Box<dyn Error + Send + Sync>;

/// Boxed future type alias used by [`HttpTransport`] to keep the trait dyn-compatible.
pub type HttpFuture<'a> =
    Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + 'a>>;

/// HTTP verbs used by the Git Data API calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PATCH`
    Patch,
}

/// An authenticated JSON request to the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    /// HTTP verb.
    pub method: Method,
    /// Absolute request URL.
    pub url: String,
    /// JSON request body, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl HttpRequest {
    /// A `GET` request with no body.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
        }
    }

    /// A `POST` request with a JSON body.
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: Some(body),
        }
    }

    /// A `PATCH` request with a JSON body.
    pub fn patch(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Patch,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// Percent-encodes each `/`-separated segment of `path`, keeping the slashes.
///
/// Branch names and file paths may contain `#`, `%`, `?` or spaces, which
/// must not reach a URL unescaped.
#[must_use]
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// Status and decoded JSON body of an API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body; `Value::Null` when empty.
    #[serde(default)]
    pub body: Value,
}

impl HttpResponse {
    /// A response with the given status and body.
    #[must_use]
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

/// Sends requests to the remote object store.
///
/// The token, base headers and timeouts are the implementation's concern;
/// callers only see a status and a JSON body.
pub trait HttpTransport: Send + Sync {
    /// Sends one request and waits for its response.
    ///
    /// # Errors
    ///
    /// Returns an error only when no HTTP response was obtained (connection,
    /// TLS, timeout). Non-2xx statuses are successful sends.
    fn send(&self, request: &HttpRequest) -> HttpFuture<'_>;
}
