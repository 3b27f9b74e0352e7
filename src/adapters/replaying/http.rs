//! Replaying adapter for the `HttpTransport` port.

use std::sync::{Mutex, PoisonError};

use serde_json::Value;
use tracing::warn;

use super::replay_result;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::http::{HttpFuture, HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Serves recorded API responses from a cassette, in recorded order.
///
/// Interactions are recorded in completion order, so a cassette only replays
/// faithfully when it was recorded with a concurrency of one. Any request
/// that differs from its recorded counterpart is logged.
pub struct ReplayingHttpTransport {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingHttpTransport {
    /// Creates a replaying transport from a cassette replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self {
            replayer: Mutex::new(replayer),
        }
    }

    /// Number of recorded responses not yet served.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.replayer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remaining()
    }
}

impl HttpTransport for ReplayingHttpTransport {
    fn send(&self, request: &HttpRequest) -> HttpFuture<'_> {
        let (recorded, output) = {
            let mut replayer = self.replayer.lock().unwrap_or_else(PoisonError::into_inner);
            let interaction = replayer.next_interaction("http", "send");
            (interaction.input.clone(), interaction.output.clone())
        };

        if !matches_recording(&recorded, request) {
            warn!(
                target: "ghcommit::replay",
                recorded = %recorded,
                method = ?request.method,
                url = %request.url,
                "request differs from the recorded one"
            );
        }

        let result: Result<HttpResponse, TransportError> = replay_result(&output, "http::send");
        Box::pin(async move { result })
    }
}

/// Whether `request` has the method, URL and body of the recorded input.
fn matches_recording(recorded: &Value, request: &HttpRequest) -> bool {
    let method = serde_json::to_value(request.method).ok();
    recorded.get("method") == method.as_ref()
        && recorded.get("url").and_then(Value::as_str) == Some(request.url.as_str())
        && recorded.get("body") == request.body.as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Cassette, Interaction};
    use chrono::Utc;
    use serde_json::json;

    fn make_replayer(interactions: Vec<Interaction>) -> CassetteReplayer {
        let cassette = Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            target: "o/r@main".into(),
            interactions,
        };
        CassetteReplayer::new(&cassette)
    }

    #[tokio::test]
    async fn replays_responses_and_transport_errors() {
        let replayer = make_replayer(vec![
            Interaction {
                seq: 0,
                port: "http".into(),
                method: "send".into(),
                input: json!({"method": "GET", "url": "https://api.test/a"}),
                output: json!({"ok": {"status": 200, "body": {"sha": "c0"}}}),
            },
            Interaction {
                seq: 1,
                port: "http".into(),
                method: "send".into(),
                input: json!({"method": "GET", "url": "https://api.test/b"}),
                output: json!({"err": "connection reset"}),
            },
        ]);
        let transport = ReplayingHttpTransport::new(replayer);
        assert_eq!(transport.remaining(), 2);

        let response = transport
            .send(&HttpRequest::get("https://api.test/a"))
            .await
            .unwrap();
        assert_eq!(response, HttpResponse::new(200, json!({"sha": "c0"})));

        let err = transport
            .send(&HttpRequest::get("https://api.test/b"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "connection reset");
        assert_eq!(transport.remaining(), 0);
    }

    #[test]
    fn recorded_input_must_match_method_url_and_body() {
        let blob = HttpRequest::post("https://api.test/git/blobs", json!({"content": "a"}));
        let recorded = serde_json::to_value(&blob).unwrap();
        assert!(matches_recording(&recorded, &blob));

        let other_body = HttpRequest::post("https://api.test/git/blobs", json!({"content": "b"}));
        assert!(!matches_recording(&recorded, &other_body));

        let other_url = HttpRequest::post("https://api.test/git/trees", json!({"content": "a"}));
        assert!(!matches_recording(&recorded, &other_url));

        let get = HttpRequest::get("https://api.test/git/blobs");
        assert!(!matches_recording(&recorded, &get));
        let recorded_get = serde_json::to_value(&get).unwrap();
        assert!(matches_recording(&recorded_get, &get));
    }

    #[test]
    #[should_panic(expected = "Cassette exhausted")]
    fn empty_cassette_panics_on_send() {
        let transport = ReplayingHttpTransport::new(make_replayer(vec![]));
        let _ = transport.send(&HttpRequest::get("https://api.test/a"));
    }
}
