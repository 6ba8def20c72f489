//! Media tracks and streams.

use std::fmt;
use std::sync::Arc;

use screenrec_common::error::ScreenrecResult;
use serde::{Deserialize, Serialize};

/// The media type carried by a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Video,
    Audio,
}

/// A live media track owned by the platform.
///
/// `stop` releases the underlying device. Stopping an already stopped
/// track must succeed.
pub trait MediaTrack: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    fn kind(&self) -> TrackKind;

    /// Human-readable label (e.g. "screen:0", "Built-in Microphone").
    fn label(&self) -> &str;

    fn stop(&self) -> ScreenrecResult<()>;

    fn is_live(&self) -> bool;
}

/// Shared handle to a track. The same track can appear in a source stream
/// and in the mixed stream derived from it.
pub type TrackHandle = Arc<dyn MediaTrack>;

/// An ordered set of tracks.
#[derive(Debug, Clone, Default)]
pub struct MediaStream {
    tracks: Vec<TrackHandle>,
}

impl MediaStream {
    pub fn new(tracks: Vec<TrackHandle>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[TrackHandle] {
        &self.tracks
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &TrackHandle> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Video)
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &TrackHandle> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Audio)
    }

    pub fn first_video(&self) -> Option<&TrackHandle> {
        self.video_tracks().next()
    }

    pub fn first_audio(&self) -> Option<&TrackHandle> {
        self.audio_tracks().next()
    }

    pub fn has_audio(&self) -> bool {
        self.first_audio().is_some()
    }

    pub fn push(&mut self, track: TrackHandle) {
        self.tracks.push(track);
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }
}
