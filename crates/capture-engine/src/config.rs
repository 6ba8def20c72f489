//! Per-session capture settings.

use screenrec_common::config::{parse_resolution, RecordingDefaults};
use screenrec_common::error::ScreenrecResult;
use screenrec_platform_core::{DisplayConstraints, IdealMax, MicrophoneConstraints};
use serde::{Deserialize, Serialize};

/// Lowest bitrate a session will ask the recorder for.
pub const MIN_BITRATE_KBPS: u32 = 1000;

/// Bitrate used when none (or zero) is given.
pub const DEFAULT_BITRATE_KBPS: u32 = 12_000;

/// What the user asked for before pressing start.
///
/// Width, height and frame rate are hints; whatever the platform grants is
/// accepted without re-validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfiguration {
    /// Requested capture width in pixels (ideal and max).
    pub width: u32,
    /// Requested capture height in pixels (ideal and max).
    pub height: u32,
    /// Requested frames per second (ideal and max).
    pub frame_rate: u32,
    /// Target video bitrate in kbps. Raised to 1000 when lower.
    pub target_bitrate_kbps: u32,
    /// Ask the display prompt for system/tab audio.
    pub include_system_audio: bool,
    /// Also request the microphone and mix it in.
    pub include_microphone: bool,
}

/// The two permission requests a start issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionPlan {
    /// Constraints for the display prompt.
    pub display: DisplayConstraints,
    /// `None` when the microphone is not requested.
    pub microphone: Option<MicrophoneConstraints>,
}

impl CaptureConfiguration {
    /// Build from configured defaults (`resolution` is `"<w>x<h>"`).
    pub fn from_defaults(defaults: &RecordingDefaults) -> ScreenrecResult<Self> {
        let (width, height) = parse_resolution(&defaults.resolution)?;
        Ok(Self {
            width,
            height,
            frame_rate: defaults.fps,
            target_bitrate_kbps: defaults.bitrate_kbps,
            include_system_audio: defaults.system_audio,
            include_microphone: defaults.microphone,
        })
    }

    /// Requested bitrate, defaulted when zero and clamped to the floor.
    pub fn effective_bitrate_kbps(&self) -> u32 {
        let kbps = if self.target_bitrate_kbps == 0 {
            DEFAULT_BITRATE_KBPS
        } else {
            self.target_bitrate_kbps
        };
        kbps.max(MIN_BITRATE_KBPS)
    }

    pub fn target_bitrate_bps(&self) -> u64 {
        u64::from(self.effective_bitrate_kbps()) * 1000
    }

    pub fn display_constraints(&self) -> DisplayConstraints {
        DisplayConstraints {
            width: IdealMax::capped(self.width),
            height: IdealMax::capped(self.height),
            frame_rate: IdealMax::capped(self.frame_rate),
            show_cursor: true,
            audio: self.include_system_audio,
        }
    }

    pub fn microphone_constraints(&self) -> Option<MicrophoneConstraints> {
        self.include_microphone
            .then(MicrophoneConstraints::default)
    }

    pub fn acquisition_plan(&self) -> AcquisitionPlan {
        AcquisitionPlan {
            display: self.display_constraints(),
            microphone: self.microphone_constraints(),
        }
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            frame_rate: 30,
            target_bitrate_kbps: DEFAULT_BITRATE_KBPS,
            include_system_audio: true,
            include_microphone: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitrate_is_clamped_to_floor() {
        let config = CaptureConfiguration {
            target_bitrate_kbps: 200,
            ..Default::default()
        };
        assert_eq!(config.effective_bitrate_kbps(), MIN_BITRATE_KBPS);
        assert_eq!(config.target_bitrate_bps(), 1_000_000);
    }

    #[test]
    fn test_zero_bitrate_uses_default() {
        let config = CaptureConfiguration {
            target_bitrate_kbps: 0,
            ..Default::default()
        };
        assert_eq!(config.target_bitrate_bps(), 12_000_000);
    }

    #[test]
    fn test_constraints_cap_at_requested_values() {
        let config = CaptureConfiguration {
            width: 2560,
            height: 1440,
            frame_rate: 60,
            include_system_audio: false,
            include_microphone: true,
            ..Default::default()
        };
        let plan = config.acquisition_plan();
        assert_eq!(plan.display.width, IdealMax { ideal: 2560, max: 2560 });
        assert_eq!(plan.display.frame_rate.max, 60);
        assert!(plan.display.show_cursor);
        assert!(!plan.display.audio);

        let mic = plan.microphone.expect("microphone requested");
        assert!(mic.echo_cancellation && mic.noise_suppression && mic.auto_gain_control);
    }

    #[test]
    fn test_builds_from_recording_defaults() {
        let defaults = RecordingDefaults {
            resolution: "1280x720".to_string(),
            fps: 24,
            ..Default::default()
        };
        let config = CaptureConfiguration::from_defaults(&defaults).unwrap();
        assert_eq!((config.width, config.height, config.frame_rate), (1280, 720, 24));
        assert!(config.microphone_constraints().is_none());
    }
}
