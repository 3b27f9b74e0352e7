//! Process configuration read from the environment.
//!
//! Values come from the process environment, with a `.env` file in the
//! working directory loaded first (existing variables win). Repository,
//! branch and API URL are CLI flags that fall back to their own variables;
//! see `cli.rs`.

use std::path::PathBuf;
use std::time::Duration;

use crate::adapters::live::http::DEFAULT_TIMEOUT;

/// Personal access token used for every API call.
pub const TOKEN_VAR: &str = "GITHUB_TOKEN";
/// Per-request timeout in seconds.
pub const TIMEOUT_VAR: &str = "GHCOMMIT_TIMEOUT_SECS";
/// Record API traffic to this cassette file.
pub const RECORD_VAR: &str = "GHCOMMIT_RECORD";
/// Serve API traffic from this cassette file instead of the network.
pub const REPLAY_VAR: &str = "GHCOMMIT_REPLAY";

/// Settings that select and configure the HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// API token, if set.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Cassette to record to.
    pub record: Option<PathBuf>,
    /// Cassette to replay from.
    pub replay: Option<PathBuf>,
}

impl Settings {
    /// Loads `.env` (if present) and reads settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error string if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, String> {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns an error string if a variable is set to an invalid value or
    /// both recording and replaying are requested.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout = match non_empty(TIMEOUT_VAR) {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| invalid_timeout(&raw))?;
                if secs == 0 {
                    return Err(format!("{TIMEOUT_VAR} must be greater than zero"));
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_TIMEOUT,
        };

        let settings = Self {
            token: non_empty(TOKEN_VAR),
            timeout,
            record: non_empty(RECORD_VAR).map(PathBuf::from),
            replay: non_empty(REPLAY_VAR).map(PathBuf::from),
        };

        if settings.record.is_some() && settings.replay.is_some() {
            return Err(format!(
                "{RECORD_VAR} and {REPLAY_VAR} cannot be used together"
            ));
        }
        Ok(settings)
    }

    /// The API token.
    ///
    /// # Errors
    ///
    /// Returns an error string if no token is configured.
    pub fn token(&self) -> Result<&str, String> {
        self.token
            .as_deref()
            .ok_or_else(|| format!("{TOKEN_VAR} is not set; export it or add it to .env"))
    }
}

fn invalid_timeout(raw: &str) -> String {
    format!(
        "{TIMEOUT_VAR} must be a whole number of seconds, got {raw:?}"
    )
}
