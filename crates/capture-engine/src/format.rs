//! Container/codec identifiers and recorder option selection.

use screenrec_platform_core::{RecorderBackend, RecorderOptions};

/// Identifiers probed for the capability report, best first.
pub const PROBE_CANDIDATES: [&str; 5] = [
    "video/webm;codecs=vp9,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm;codecs=vp9",
    "video/webm",
    "video/mp4",
];

/// Identifiers tried when constructing the recorder, best first.
pub const RECORDER_CANDIDATES: [&str; 4] = [
    "video/webm;codecs=vp9,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm",
    "video/mp4",
];

/// Type tag used when the recorder does not report one.
pub const DEFAULT_MIME: &str = "video/webm";

/// Pick the first supported recorder candidate.
///
/// When nothing is supported the mime type is left unset so the platform
/// chooses its own default container.
pub fn choose_recorder_options(backend: &dyn RecorderBackend, bitrate_bps: u64) -> RecorderOptions {
    let mime_type = RECORDER_CANDIDATES
        .iter()
        .find(|candidate| backend.is_type_supported(candidate))
        .map(|candidate| candidate.to_string());

    if mime_type.is_none() {
        tracing::warn!("No preferred container supported; using platform default");
    }

    RecorderOptions {
        mime_type,
        video_bits_per_second: bitrate_bps,
    }
}

/// File extension matching a negotiated identifier.
pub fn file_extension(mime_type: &str) -> &'static str {
    if mime_type.contains("mp4") {
        "mp4"
    } else {
        "webm"
    }
}
