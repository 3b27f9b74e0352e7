//! Replaying adapters that serve recorded interactions.

pub mod http;

pub use http::ReplayingHttpTransport;

use serde::de::DeserializeOwned;

/// Turns a recorded `{"ok": ..}` / `{"err": ..}` output back into a `Result`.
///
/// Mirror of `recording::record_result`.
pub(crate) fn replay_result<T: DeserializeOwned>(
    output: &serde_json::Value,
    context: &str,
) -> Result<T, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(err) = output.get("err") {
        let msg = err.as_str().unwrap_or("unknown error").to_string();
        return Err(msg.into());
    }
    let value = output.get("ok").unwrap_or(output);
    serde_json::from_value(value.clone())
        .map_err(|e| format!("{context}: failed to deserialize recorded output: {e}").into())
}
