//! Live adapter for the `HttpTransport` port using `reqwest`.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde_json::Value;

use crate::ports::http::{
    HttpFuture, HttpRequest, HttpResponse, HttpTransport, Method, TransportError,
};

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("ghcommit/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Live transport that talks to the GitHub REST API with a personal token.
pub struct LiveHttpTransport {
    client: Client,
}

impl LiveHttpTransport {
    /// Creates a transport that authenticates every request with `token`.
    ///
    /// # Errors
    ///
    /// Returns an error string if the token is not a valid header value or
    /// the HTTP client cannot be built.
    pub fn new(token: &str, timeout: Duration) -> Result<Self, String> {
        let mut auth = HeaderValue::from_str(&format!("token {token}"))
            .map_err(|_| "GitHub token contains characters not allowed in a header".to_string())?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_MEDIA_TYPE));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;

        Ok(Self { client })
    }
}

impl HttpTransport for LiveHttpTransport {
    fn send(&self, request: &HttpRequest) -> HttpFuture<'_> {
        let request = request.clone();

        Box::pin(async move {
            let builder = match request.method {
                Method::Get => self.client.get(&request.url),
                Method::Post => self.client.post(&request.url),
                Method::Patch => self.client.patch(&request.url),
            };
            let builder = match &request.body {
                Some(body) => builder.json(body),
                None => builder,
            };

            let response = builder.send().await.map_err(|e| -> TransportError {
                let url = &request.url;
                format!("GitHub API request to {url} failed: {e}").into()
            })?;

            let status = response.status().as_u16();
            let text = response.text().await.map_err(|e| -> TransportError {
                format!("Failed to read GitHub API response: {e}").into()
            })?;

            Ok(HttpResponse {
                status,
                body: parse_body(text),
            })
        })
    }
}

/// Decodes a response body, keeping non-JSON text as a string value.
fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
