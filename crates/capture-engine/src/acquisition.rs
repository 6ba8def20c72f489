//! Display and microphone acquisition.

use screenrec_common::error::{ScreenrecError, ScreenrecResult};
use screenrec_platform_core::{
    DisplayCaptureProvider, MediaStream, MicrophoneProvider, SharingEnded,
};

use crate::config::AcquisitionPlan;
use crate::teardown::stop_stream;

/// Streams granted for one session.
#[derive(Debug)]
pub struct AcquiredStreams {
    /// Exactly one video track plus an optional system-audio track.
    pub display: MediaStream,
    /// Granted microphone stream, if requested and available.
    pub microphone: Option<MediaStream>,
    /// Fires when the user stops sharing from outside the app.
    pub ended: SharingEnded,
}

impl AcquiredStreams {
    /// Number of raw audio tracks that will feed the mixer (0..=2).
    pub fn audio_source_count(&self) -> usize {
        usize::from(self.display.has_audio())
            + usize::from(self.microphone.as_ref().is_some_and(MediaStream::has_audio))
    }
}

/// Stops the guarded stream on drop unless released with `into_inner`.
///
/// Keeps a granted display alive only while the surrounding acquisition
/// future is; an aborted start leaves nothing running.
struct StreamGuard {
    stream: MediaStream,
    armed: bool,
    label: &'static str,
}

impl StreamGuard {
    fn new(stream: MediaStream, label: &'static str) -> Self {
        Self {
            stream,
            armed: true,
            label,
        }
    }

    fn get(&self) -> &MediaStream {
        &self.stream
    }

    fn into_inner(mut self) -> MediaStream {
        self.armed = false;
        std::mem::take(&mut self.stream)
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(source = self.label, "Releasing abandoned capture");
            stop_stream(self.label, &self.stream);
        }
    }
}

/// Request the display (and optionally the microphone).
///
/// Display failures are returned as-is. Microphone failures are logged
/// and tolerated.
pub async fn acquire_streams(
    display_provider: &dyn DisplayCaptureProvider,
    microphone_provider: &dyn MicrophoneProvider,
    plan: &AcquisitionPlan,
) -> ScreenrecResult<AcquiredStreams> {
    tracing::info!(
        width = plan.display.width.ideal,
        height = plan.display.height.ideal,
        fps = plan.display.frame_rate.ideal,
        system_audio = plan.display.audio,
        microphone = plan.microphone.is_some(),
        "Requesting display capture"
    );

    let capture = display_provider.request(&plan.display).await?;
    let ended = capture.ended;
    let display = StreamGuard::new(capture.stream, "display");

    let video_tracks = display.get().video_tracks().count();
    if video_tracks == 0 {
        return Err(ScreenrecError::capture(
            "Display capture granted no video track",
        ));
    }
    if video_tracks > 1 {
        tracing::warn!(video_tracks, "Display capture granted several video tracks; using the first");
    }
    if plan.display.audio && !display.get().has_audio() {
        tracing::info!("System audio requested but not granted; continuing without it");
    }

    let microphone = match plan.microphone.as_ref() {
        Some(constraints) => match microphone_provider.request(constraints).await {
            Ok(stream) if stream.has_audio() => Some(stream),
            Ok(stream) => {
                tracing::warn!("Microphone granted without an audio track; continuing without it");
                stop_stream("microphone", &stream);
                None
            }
            Err(e) => {
                let e = ScreenrecError::device_unavailable(e.user_message());
                tracing::warn!(error = %e, "Microphone capture denied; continuing without it");
                None
            }
        },
        None => None,
    };

    Ok(AcquiredStreams {
        display: display.into_inner(),
        microphone,
        ended,
    })
}
