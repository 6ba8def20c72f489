//! Scripted display and microphone providers.

use std::sync::Arc;

use async_trait::async_trait;
use screenrec_common::error::{ScreenrecError, ScreenrecResult};
use screenrec_platform_core::{
    DisplayCapture, DisplayCaptureProvider, DisplayConstraints, MediaStream,
    MicrophoneConstraints, MicrophoneProvider, SharingEnded, TrackHandle, TrackKind,
};

use crate::{DisplayOutcome, MicrophoneOutcome, Shared};

pub struct SyntheticDisplay {
    shared: Arc<Shared>,
}

impl SyntheticDisplay {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl DisplayCaptureProvider for SyntheticDisplay {
    fn is_available(&self) -> bool {
        self.shared.options.display_available
    }

    async fn request(&self, constraints: &DisplayConstraints) -> ScreenrecResult<DisplayCapture> {
        self.shared.record_display_request(constraints);
        if self.shared.options.gate_display_prompt {
            tracing::debug!("Display prompt waiting for user");
            self.shared.prompt.notified().await;
        }

        let options = &self.shared.options;
        let tracks: Vec<TrackHandle> = match options.display {
            DisplayOutcome::Deny => {
                return Err(ScreenrecError::permission_denied(
                    "The user dismissed the screen sharing prompt",
                ))
            }
            DisplayOutcome::Unsupported => {
                return Err(ScreenrecError::unsupported(
                    "Screen capture is not supported here",
                ))
            }
            DisplayOutcome::GrantAudioOnly => {
                let audio: TrackHandle = self.shared.new_track(TrackKind::Audio, "system audio", false);
                vec![audio]
            }
            DisplayOutcome::Grant { system_audio } => {
                let label = format!(
                    "screen:0 {}x{}@{}",
                    constraints.width.ideal, constraints.height.ideal, constraints.frame_rate.ideal
                );
                let video: TrackHandle = self.shared.new_track(
                    TrackKind::Video,
                    &label,
                    options.fail_display_track_stop,
                );
                let mut tracks = vec![video];
                if constraints.audio && system_audio {
                    tracks.push(self.shared.new_track(TrackKind::Audio, "system audio", false));
                }
                tracks
            }
        };

        let (notifier, ended) = SharingEnded::channel();
        self.shared.add_notifier(notifier);
        tracing::debug!(tracks = tracks.len(), "Display capture granted");

        Ok(DisplayCapture {
            stream: MediaStream::new(tracks),
            ended,
        })
    }
}

pub struct SyntheticMicrophone {
    shared: Arc<Shared>,
}

impl SyntheticMicrophone {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl MicrophoneProvider for SyntheticMicrophone {
    async fn request(&self, constraints: &MicrophoneConstraints) -> ScreenrecResult<MediaStream> {
        self.shared.record_microphone_request();
        match self.shared.options.microphone {
            MicrophoneOutcome::Grant => {
                tracing::debug!(
                    echo_cancellation = constraints.echo_cancellation,
                    noise_suppression = constraints.noise_suppression,
                    auto_gain_control = constraints.auto_gain_control,
                    "Microphone granted"
                );
                let track: TrackHandle =
                    self.shared.new_track(TrackKind::Audio, "Synthetic Microphone", false);
                Ok(MediaStream::new(vec![track]))
            }
            MicrophoneOutcome::Deny => Err(ScreenrecError::permission_denied(
                "Microphone access was denied",
            )),
            MicrophoneOutcome::Unavailable => Err(ScreenrecError::device_unavailable(
                "No microphone found",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyntheticPlatform;
    use screenrec_platform_core::IdealMax;

    fn constraints(audio: bool) -> DisplayConstraints {
        DisplayConstraints {
            width: IdealMax::capped(1280),
            height: IdealMax::capped(720),
            frame_rate: IdealMax::capped(30),
            show_cursor: true,
            audio,
        }
    }

    #[tokio::test]
    async fn test_grant_follows_audio_request() {
        let synthetic = SyntheticPlatform::default();
        let platform = synthetic.platform();

        let with_audio = platform.display.request(&constraints(true)).await.unwrap();
        assert_eq!(with_audio.stream.len(), 2);

        let without_audio = platform.display.request(&constraints(false)).await.unwrap();
        assert_eq!(without_audio.stream.len(), 1);
        assert!(!without_audio.stream.has_audio());

        assert_eq!(synthetic.display_requests(), 2);
        assert_eq!(
            synthetic.last_display_constraints().unwrap().width.ideal,
            1280
        );
    }

    #[tokio::test]
    async fn test_denial_is_permission_denied() {
        let synthetic = SyntheticPlatform::builder()
            .display(DisplayOutcome::Deny)
            .microphone(MicrophoneOutcome::Unavailable)
            .build();
        let platform = synthetic.platform();

        let display = platform.display.request(&constraints(true)).await;
        assert!(matches!(display, Err(ScreenrecError::PermissionDenied { .. })));

        let mic = platform
            .microphone
            .request(&MicrophoneConstraints::default())
            .await;
        assert!(matches!(mic, Err(ScreenrecError::DeviceUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_end_sharing_notifies_grant() {
        let synthetic = SyntheticPlatform::default();
        let mut capture = synthetic
            .platform()
            .display
            .request(&constraints(false))
            .await
            .unwrap();

        assert!(synthetic.end_sharing());
        tokio::time::timeout(std::time::Duration::from_secs(1), capture.ended.recv())
            .await
            .unwrap();
        assert!(!synthetic.end_sharing());
    }
}
