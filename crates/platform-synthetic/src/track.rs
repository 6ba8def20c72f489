//! Synthetic media tracks.

use std::sync::atomic::{AtomicBool, Ordering};

use screenrec_common::error::{ScreenrecError, ScreenrecResult};
use screenrec_platform_core::{MediaTrack, TrackKind};

/// A track whose liveness is a flag.
#[derive(Debug)]
pub struct SyntheticTrack {
    id: String,
    kind: TrackKind,
    label: String,
    live: AtomicBool,
    fail_stop: bool,
}

impl SyntheticTrack {
    pub fn new(id: impl Into<String>, kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            live: AtomicBool::new(true),
            fail_stop: false,
        }
    }

    /// A track whose `stop` always fails and leaves it live.
    pub fn failing(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// End the track as if the device went away.
    pub fn end(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

impl MediaTrack for SyntheticTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn stop(&self) -> ScreenrecResult<()> {
        if self.fail_stop {
            return Err(ScreenrecError::release(
                format!("track {}", self.id),
                "refused to stop",
            ));
        }
        if self.live.swap(false, Ordering::SeqCst) {
            tracing::trace!(track = %self.id, label = %self.label, "Track stopped");
        }
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_is_idempotent() {
        let track = SyntheticTrack::new("v0", TrackKind::Video, "screen:0");
        assert!(track.is_live());
        track.stop().unwrap();
        track.stop().unwrap();
        assert!(!track.is_live());
    }

    #[test]
    fn test_failing_track_stays_live() {
        let track = SyntheticTrack::new("v0", TrackKind::Video, "screen:0").failing();
        assert!(matches!(
            track.stop(),
            Err(ScreenrecError::ResourceReleaseFailure { .. })
        ));
        assert!(track.is_live());
    }
}
