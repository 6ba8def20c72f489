//! Chunking media recorder.
//!
//! A recorder encodes a [`MediaStream`] and reports its lifecycle through
//! [`RecorderEvent`]s sent on the channel given at construction. Events
//! arrive in the order the recorder produced them.

use std::time::Duration;

use screenrec_common::error::ScreenrecResult;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::track::MediaStream;

/// Recorder lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    Started,
    /// An encoded segment. May be empty.
    Data(Vec<u8>),
    Paused,
    Resumed,
    /// Emitted after the final `Data` flush.
    Stopped,
    Error(String),
}

pub type RecorderEventSink = mpsc::UnboundedSender<RecorderEvent>;
pub type RecorderEventStream = mpsc::UnboundedReceiver<RecorderEvent>;

/// Construction options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderOptions {
    /// Container/codec identifier. `None` lets the platform pick.
    pub mime_type: Option<String>,
    /// Target video bitrate.
    pub video_bits_per_second: u64,
}

/// Recorder state as reported by the primitive itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderState {
    Inactive,
    Recording,
    Paused,
}

/// A media recorder bound to one stream.
pub trait MediaRecorder: Send {
    /// Begin encoding, emitting a `Data` event every `timeslice` of media.
    fn start(&mut self, timeslice: Duration) -> ScreenrecResult<()>;

    fn pause(&mut self) -> ScreenrecResult<()>;

    fn resume(&mut self) -> ScreenrecResult<()>;

    /// Flush the remaining data and emit `Stopped`.
    fn stop(&mut self) -> ScreenrecResult<()>;

    fn state(&self) -> RecorderState;

    /// The negotiated container/codec identifier.
    fn mime_type(&self) -> String;
}

/// Constructs recorders and answers format support queries.
pub trait RecorderBackend: Send + Sync {
    /// Whether a recorder primitive exists on this host.
    fn is_available(&self) -> bool;

    fn is_type_supported(&self, mime_type: &str) -> bool;

    fn create(
        &self,
        stream: &MediaStream,
        options: &RecorderOptions,
        events: RecorderEventSink,
    ) -> ScreenrecResult<Box<dyn MediaRecorder>>;
}
