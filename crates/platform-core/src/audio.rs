//! Audio mixing graph.

use screenrec_common::error::ScreenrecResult;

use crate::track::{MediaStream, TrackHandle};

/// Creates audio processing contexts.
pub trait AudioGraphProvider: Send + Sync {
    fn create_context(&self) -> ScreenrecResult<Box<dyn AudioContext>>;
}

/// A live audio processing context. Must be closed to release its
/// resources; closing twice is allowed to fail.
pub trait AudioContext: Send {
    /// Create a node that sums every source connected to it.
    fn create_destination(&mut self) -> ScreenrecResult<Box<dyn MixDestination>>;

    fn close(&mut self) -> ScreenrecResult<()>;
}

/// A mixing destination node.
pub trait MixDestination: Send {
    /// Route an audio track into the mix.
    fn connect(&mut self, track: TrackHandle) -> ScreenrecResult<()>;

    /// The combined audio output.
    fn output(&self) -> MediaStream;
}
