//! Audio mixing into a single recordable stream.
//!
//! The recorder takes exactly one stream. System audio and microphone are
//! summed through one mixing destination so neither displaces the other,
//! and the display video track is carried over untouched.

use screenrec_common::error::{ScreenrecError, ScreenrecResult};
use screenrec_platform_core::{AudioContext, AudioGraphProvider, MediaStream, TrackHandle};

/// The recordable stream plus the audio context feeding it, if any.
pub struct MixedOutput {
    pub stream: MediaStream,
    /// Owned by the session; closed at teardown.
    pub context: Option<Box<dyn AudioContext>>,
}

/// Combine the display video with zero, one, or two audio tracks.
///
/// Without audio no context is created. A failure after the context was
/// created closes it before returning.
pub fn mix_streams(
    display: &MediaStream,
    microphone: Option<&MediaStream>,
    graph: &dyn AudioGraphProvider,
) -> ScreenrecResult<MixedOutput> {
    let video = display
        .first_video()
        .cloned()
        .ok_or_else(|| ScreenrecError::capture("No video track to record"))?;

    let sources: Vec<TrackHandle> = display
        .first_audio()
        .into_iter()
        .chain(microphone.and_then(MediaStream::first_audio))
        .cloned()
        .collect();

    if sources.is_empty() {
        tracing::debug!("No audio tracks; recording video only");
        return Ok(MixedOutput {
            stream: MediaStream::new(vec![video]),
            context: None,
        });
    }

    let mut context = graph.create_context()?;
    match connect_sources(context.as_mut(), &sources) {
        Ok(mixed_audio) => {
            tracing::info!(sources = sources.len(), "Audio sources mixed");
            let mut stream = MediaStream::new(vec![video]);
            for track in mixed_audio.tracks() {
                stream.push(track.clone());
            }
            Ok(MixedOutput {
                stream,
                context: Some(context),
            })
        }
        Err(e) => {
            if let Err(close_err) = context.close() {
                tracing::warn!(error = %close_err, "Error closing audio context after mixing failure");
            }
            Err(e)
        }
    }
}

fn connect_sources(
    context: &mut dyn AudioContext,
    sources: &[TrackHandle],
) -> ScreenrecResult<MediaStream> {
    let mut destination = context.create_destination()?;
    for track in sources {
        tracing::debug!(track = track.label(), "Connecting audio source");
        destination.connect(track.clone())?;
    }
    Ok(destination.output())
}
