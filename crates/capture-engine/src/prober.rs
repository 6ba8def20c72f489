//! Host capability probing.
//!
//! Runs before every start (and once when the controller is created). It
//! only reads the host; session state is never touched.

use screenrec_common::error::{ScreenrecError, ScreenrecResult};
use screenrec_platform_core::{status_mark, Capability, Platform};
use serde::{Deserialize, Serialize};

use crate::format::PROBE_CANDIDATES;

pub const DISPLAY_CAPTURE: &str = "getDisplayMedia";
pub const MEDIA_RECORDER: &str = "MediaRecorder";

/// Label shown when no candidate identifier is supported.
pub const NO_SUPPORTED_CONTAINER: &str = "No supported container";

/// Whether the recorder can produce one container/codec identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSupport {
    pub mime_type: String,
    pub supported: bool,
}

/// Result of a probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityReport {
    pub capabilities: Vec<Capability>,
    /// Every probe candidate, in priority order.
    pub formats: Vec<FormatSupport>,
    /// First supported candidate.
    pub preferred: Option<String>,
}

impl CapabilityReport {
    pub fn display_capture_available(&self) -> bool {
        self.capabilities
            .iter()
            .any(|c| c.name == DISPLAY_CAPTURE && c.available)
    }

    /// Fail with `UnsupportedPlatform` when display capture is missing.
    pub fn ensure_supported(&self) -> ScreenrecResult<()> {
        if self.display_capture_available() {
            Ok(())
        } else {
            Err(ScreenrecError::unsupported(
                "Your platform doesn't support screen capture. Use a desktop session with a screen capture portal.",
            ))
        }
    }

    /// Human-readable report, one entry per line.
    pub fn lines(&self) -> Vec<String> {
        self.capabilities
            .iter()
            .map(Capability::report_line)
            .chain(self.formats.iter().map(|f| {
                format!("supports {}: {}", f.mime_type, status_mark(f.supported))
            }))
            .collect()
    }

    pub fn format_label(&self) -> String {
        self.preferred
            .clone()
            .unwrap_or_else(|| NO_SUPPORTED_CONTAINER.to_string())
    }
}

/// Query the host for capture/record support.
pub fn probe(platform: &Platform) -> CapabilityReport {
    let has_display = platform.display.is_available();
    let has_recorder = platform.recorder.is_available();

    let formats: Vec<FormatSupport> = PROBE_CANDIDATES
        .iter()
        .map(|mime| FormatSupport {
            mime_type: mime.to_string(),
            supported: has_recorder && platform.recorder.is_type_supported(mime),
        })
        .collect();

    let preferred = formats
        .iter()
        .find(|f| f.supported)
        .map(|f| f.mime_type.clone());

    tracing::debug!(
        display_capture = has_display,
        recorder = has_recorder,
        preferred = preferred.as_deref().unwrap_or("none"),
        "Capability probe finished"
    );

    CapabilityReport {
        capabilities: vec![
            Capability::new(DISPLAY_CAPTURE, has_display, true),
            Capability::new(MEDIA_RECORDER, has_recorder, true),
        ],
        formats,
        preferred,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use screenrec_platform_synthetic::SyntheticPlatform;

    #[test]
    fn test_probe_lists_every_candidate() {
        let synthetic = SyntheticPlatform::default();
        let report = probe(&synthetic.platform());

        assert!(report.display_capture_available());
        assert!(report.ensure_supported().is_ok());
        assert_eq!(report.formats.len(), PROBE_CANDIDATES.len());
        assert_eq!(report.preferred.as_deref(), Some("video/webm;codecs=vp9,opus"));

        let lines = report.lines();
        assert_eq!(lines[0], "getDisplayMedia: ✅");
        assert_eq!(lines[1], "MediaRecorder: ✅");
        assert!(lines.contains(&"supports video/mp4: ❌".to_string()));
    }

    #[test]
    fn test_missing_display_capture_is_unsupported() {
        let synthetic = SyntheticPlatform::builder().display_available(false).build();
        let report = probe(&synthetic.platform());

        assert!(matches!(
            report.ensure_supported(),
            Err(ScreenrecError::UnsupportedPlatform { .. })
        ));
        assert_eq!(report.lines()[0], "getDisplayMedia: ❌");
    }

    #[test]
    fn test_no_supported_container_is_labelled() {
        let synthetic = SyntheticPlatform::builder()
            .supported_types(Vec::<String>::new())
            .build();
        let report = probe(&synthetic.platform());

        assert!(report.preferred.is_none());
        assert_eq!(report.format_label(), NO_SUPPORTED_CONTAINER);
        assert!(report.formats.iter().all(|f| !f.supported));
    }

    #[test]
    fn test_missing_recorder_supports_nothing() {
        let synthetic = SyntheticPlatform::builder().recorder_available(false).build();
        let report = probe(&synthetic.platform());
        assert!(report.preferred.is_none());
        assert_eq!(report.lines()[1], "MediaRecorder: ❌");
    }
}
