//! Mixing graph that tracks context lifetimes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use screenrec_common::error::{ScreenrecError, ScreenrecResult};
use screenrec_platform_core::{
    AudioContext, AudioGraphProvider, MediaStream, MediaTrack, MixDestination, TrackHandle,
    TrackKind,
};

use crate::track::SyntheticTrack;
use crate::Shared;

pub struct SyntheticAudioGraph {
    shared: Arc<Shared>,
}

impl SyntheticAudioGraph {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

impl AudioGraphProvider for SyntheticAudioGraph {
    fn create_context(&self) -> ScreenrecResult<Box<dyn AudioContext>> {
        if self.shared.options.fail_audio_context {
            return Err(ScreenrecError::capture("Audio context could not be created"));
        }
        Ok(Box::new(SyntheticAudioContext {
            shared: self.shared.clone(),
            closed: self.shared.register_context(),
            outputs: Vec::new(),
        }))
    }
}

/// Closing the context ends every destination output it created.
struct SyntheticAudioContext {
    shared: Arc<Shared>,
    closed: Arc<AtomicBool>,
    outputs: Vec<Arc<SyntheticTrack>>,
}

impl AudioContext for SyntheticAudioContext {
    fn create_destination(&mut self) -> ScreenrecResult<Box<dyn MixDestination>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ScreenrecError::capture("Audio context is closed"));
        }
        let output = self.shared.new_track(TrackKind::Audio, "mixed audio", false);
        self.outputs.push(output.clone());
        Ok(Box::new(SyntheticDestination {
            output,
            sources: Vec::new(),
        }))
    }

    fn close(&mut self) -> ScreenrecResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(ScreenrecError::release(
                "audio context",
                "already closed",
            ));
        }
        for output in &self.outputs {
            output.end();
        }
        tracing::trace!(destinations = self.outputs.len(), "Audio context closed");
        Ok(())
    }
}

struct SyntheticDestination {
    output: Arc<SyntheticTrack>,
    sources: Vec<TrackHandle>,
}

impl MixDestination for SyntheticDestination {
    fn connect(&mut self, track: TrackHandle) -> ScreenrecResult<()> {
        if track.kind() != TrackKind::Audio {
            return Err(ScreenrecError::capture(format!(
                "Cannot mix non-audio track {}",
                track.id()
            )));
        }
        self.sources.push(track);
        Ok(())
    }

    fn output(&self) -> MediaStream {
        let output: TrackHandle = self.output.clone();
        MediaStream::new(vec![output])
    }
}

#[cfg(test)]
mod tests {
    use crate::SyntheticPlatform;
    use screenrec_platform_core::MediaTrack;

    #[test]
    fn test_close_ends_destination_output() {
        let synthetic = SyntheticPlatform::default();
        let platform = synthetic.platform();

        let mut context = platform.audio.create_context().unwrap();
        let destination = context.create_destination().unwrap();
        let output = destination.output();
        assert!(output.tracks()[0].is_live());
        assert_eq!(synthetic.open_contexts(), 1);

        context.close().unwrap();
        assert!(!output.tracks()[0].is_live());
        assert_eq!(synthetic.open_contexts(), 0);
        assert!(context.close().is_err());
    }
}
