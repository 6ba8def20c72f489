//! Best-effort release of session resources.
//!
//! Every resource is released independently: a failure is logged as a
//! `ResourceReleaseFailure` and the remaining resources are still
//! released. Releasing twice is a no-op.

use screenrec_common::error::ScreenrecError;
use screenrec_platform_core::{AudioContext, MediaRecorder, MediaStream, RecorderState};

/// Everything a session holds between start and teardown.
#[derive(Default)]
pub struct SessionResources {
    pub display: Option<MediaStream>,
    pub microphone: Option<MediaStream>,
    pub mixed: Option<MediaStream>,
    pub audio_context: Option<Box<dyn AudioContext>>,
    pub recorder: Option<Box<dyn MediaRecorder>>,
}

impl SessionResources {
    /// Whether every handle has been cleared.
    pub fn is_clear(&self) -> bool {
        self.display.is_none()
            && self.microphone.is_none()
            && self.mixed.is_none()
            && self.audio_context.is_none()
            && self.recorder.is_none()
    }

    /// Release everything. Returns the failures that were swallowed.
    pub fn release(&mut self) -> Vec<ScreenrecError> {
        let mut failures = Vec::new();

        if let Some(mut recorder) = self.recorder.take() {
            if recorder.state() != RecorderState::Inactive {
                if let Err(e) = recorder.stop() {
                    let failure = ScreenrecError::release("recorder", e.user_message());
                    tracing::warn!(error = %failure, "Error stopping recorder");
                    failures.push(failure);
                }
            }
        }

        if let Some(display) = self.display.take() {
            failures.extend(stop_stream("display", &display));
        }
        if let Some(microphone) = self.microphone.take() {
            failures.extend(stop_stream("microphone", &microphone));
        }

        if let Some(mut context) = self.audio_context.take() {
            if let Err(e) = context.close() {
                let failure = ScreenrecError::release("audio context", e.user_message());
                tracing::warn!(error = %failure, "Error closing audio context");
                failures.push(failure);
            }
        }

        self.mixed = None;

        if !failures.is_empty() {
            tracing::warn!(failures = failures.len(), "Teardown finished with errors");
        }
        failures
    }
}

/// Stop every track of a stream, continuing past failures.
pub fn stop_stream(label: &str, stream: &MediaStream) -> Vec<ScreenrecError> {
    let mut failures = Vec::new();
    for track in stream.tracks() {
        if let Err(e) = track.stop() {
            let failure =
                ScreenrecError::release(format!("{label} track {}", track.id()), e.user_message());
            tracing::warn!(error = %failure, "Error stopping track");
            failures.push(failure);
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use screenrec_platform_core::{MediaTrack, TrackHandle, TrackKind};
    use screenrec_platform_synthetic::{SyntheticPlatform, SyntheticTrack};
    use std::sync::Arc;

    #[test]
    fn test_release_twice_is_a_no_op() {
        let video = Arc::new(SyntheticTrack::new("v", TrackKind::Video, "screen"));
        let handle: TrackHandle = video.clone();
        let mut resources = SessionResources {
            display: Some(MediaStream::new(vec![handle])),
            ..Default::default()
        };

        assert!(resources.release().is_empty());
        assert!(resources.is_clear());
        assert!(!video.is_live());
        assert!(resources.release().is_empty());
    }

    #[test]
    fn test_failures_are_collected_and_the_rest_released() {
        let synthetic = SyntheticPlatform::default();
        let stuck: TrackHandle =
            Arc::new(SyntheticTrack::new("v", TrackKind::Video, "screen").failing());
        let mic = Arc::new(SyntheticTrack::new("m", TrackKind::Audio, "mic"));
        let mic_handle: TrackHandle = mic.clone();

        let mut resources = SessionResources {
            display: Some(MediaStream::new(vec![stuck])),
            microphone: Some(MediaStream::new(vec![mic_handle])),
            audio_context: Some(synthetic.platform().audio.create_context().unwrap()),
            ..Default::default()
        };

        let failures = resources.release();
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            failures[0],
            ScreenrecError::ResourceReleaseFailure { .. }
        ));
        assert!(!mic.is_live());
        assert_eq!(synthetic.open_contexts(), 0);
        assert!(resources.is_clear());
    }
}
