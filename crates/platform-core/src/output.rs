//! Preview surface and artifact export.

use screenrec_common::error::ScreenrecResult;
use serde::{Deserialize, Serialize};

use crate::track::MediaStream;

/// A downloadable reference to a finished recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLink {
    /// Where the artifact can be fetched from (`file://...`, `blob:...`).
    pub url: String,
    /// Suggested name for the download.
    pub filename: String,
    pub mime_type: String,
    /// Payload size in bytes.
    pub size_bytes: u64,
}

/// Publishes finished recordings.
pub trait ArtifactExporter: Send + Sync {
    fn export(&self, data: &[u8], mime_type: &str, filename: &str)
        -> ScreenrecResult<ArtifactLink>;
}

/// What the preview surface currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreviewState {
    #[default]
    Empty,
    /// Live capture, never the encoder output.
    Live { track_ids: Vec<String> },
    /// A finished artifact with playback controls.
    Artifact { url: String, controls: bool },
}

/// The preview surface.
pub trait PreviewSink: Send {
    fn show_live(&mut self, stream: &MediaStream);

    fn show_artifact(&mut self, link: &ArtifactLink);

    fn clear(&mut self);

    fn state(&self) -> PreviewState;
}

/// A preview sink that only remembers what it was asked to show.
#[derive(Debug, Default)]
pub struct HeadlessPreview {
    state: PreviewState,
}

impl HeadlessPreview {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreviewSink for HeadlessPreview {
    fn show_live(&mut self, stream: &MediaStream) {
        self.state = PreviewState::Live {
            track_ids: stream.tracks().iter().map(|t| t.id().to_string()).collect(),
        };
    }

    fn show_artifact(&mut self, link: &ArtifactLink) {
        self.state = PreviewState::Artifact {
            url: link.url.clone(),
            controls: true,
        };
    }

    fn clear(&mut self) {
        self.state = PreviewState::Empty;
    }

    fn state(&self) -> PreviewState {
        self.state.clone()
    }
}
