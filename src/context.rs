//! Service context bundling the port trait objects.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use crate::adapters::live::filesystem::LiveFileSystem;
use crate::adapters::live::http::LiveHttpTransport;
use crate::adapters::recording::http::RecordingHttpTransport;
use crate::adapters::replaying::ReplayingHttpTransport;
use crate::cassette::format::Cassette;
use crate::cassette::recorder::CassetteRecorder;
use crate::cassette::replayer::CassetteReplayer;
use crate::config::Settings;
use crate::ports::filesystem::FileSystem;
use crate::ports::http::HttpTransport;

/// Bundles the ports a command needs.
///
/// Constructors wire up different transports (live, recording, replaying);
/// the filesystem is always the real one.
pub struct ServiceContext {
    /// Transport for GitHub API calls.
    pub http: Box<dyn HttpTransport>,
    /// Filesystem for reading the files to commit.
    pub fs: Box<dyn FileSystem>,
    /// Cassette recorder; written to disk on drop.
    recorder: Option<Arc<Mutex<CassetteRecorder>>>,
}

impl ServiceContext {
    /// Picks live, recording or replaying mode from `settings`.
    ///
    /// `target` (`owner/name@branch`) is stored in a recorded cassette.
    ///
    /// # Errors
    ///
    /// Returns an error string if the token is missing (live and recording
    /// modes) or the replay cassette cannot be loaded.
    pub fn from_settings(settings: &Settings, target: &str) -> Result<Self, String> {
        if let Some(path) = &settings.replay {
            Self::replaying(path)
        } else if let Some(path) = &settings.record {
            Self::recording(settings, path, target)
        } else {
            Self::live(settings)
        }
    }

    /// A context that talks to GitHub.
    ///
    /// # Errors
    ///
    /// Returns an error string if the token is missing or invalid.
    pub fn live(settings: &Settings) -> Result<Self, String> {
        let transport = LiveHttpTransport::new(settings.token()?, settings.timeout)?;
        Ok(Self::with_transport(Box::new(transport)))
    }

    /// A live context whose API traffic is written to a cassette at `path` on drop.
    ///
    /// # Errors
    ///
    /// Returns an error string if the token is missing or invalid.
    pub fn recording(settings: &Settings, path: &Path, target: &str) -> Result<Self, String> {
        let live = LiveHttpTransport::new(settings.token()?, settings.timeout)?;
        let recorder = CassetteRecorder::new(path, "ghcommit-session", target);
        let recorder = Arc::new(Mutex::new(recorder));
        let http = RecordingHttpTransport::new(Box::new(live), Arc::clone(&recorder));
        Ok(Self {
            http: Box::new(http),
            fs: Box::new(LiveFileSystem),
            recorder: Some(recorder),
        })
    }

    /// A context that serves API responses from the cassette at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error string if the cassette file cannot be read or parsed.
    pub fn replaying(path: &Path) -> Result<Self, String> {
        let cassette = Cassette::load(path)?;
        let transport = ReplayingHttpTransport::new(CassetteReplayer::new(&cassette));
        Ok(Self::with_transport(Box::new(transport)))
    }

    /// A context around any transport, with the live filesystem.
    #[must_use]
    pub fn with_transport(http: Box<dyn HttpTransport>) -> Self {
        Self {
            http,
            fs: Box::new(LiveFileSystem),
            recorder: None,
        }
    }
}

impl Drop for ServiceContext {
    fn drop(&mut self) {
        if let Some(recorder) = self.recorder.take() {
            let recorder = recorder.lock().unwrap_or_else(PoisonError::into_inner);
            match recorder.write() {
                Ok(path) => {
                    tracing::info!(target: "ghcommit", path = %path.display(), "cassette written");
                }
                Err(e) => tracing::warn!(target: "ghcommit", "failed to write cassette: {e}"),
            }
        }
    }
}
