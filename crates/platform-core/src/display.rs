//! Display and microphone capture providers.
//!
//! Both requests may suspend on a user consent prompt. Dismissing the
//! prompt surfaces as `ScreenrecError::PermissionDenied`.

use async_trait::async_trait;
use screenrec_common::error::ScreenrecResult;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::track::MediaStream;

/// A numeric constraint expressed as a preferred value and an upper bound.
/// The platform may grant anything up to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdealMax {
    pub ideal: u32,
    pub max: u32,
}

impl IdealMax {
    /// Prefer `value` and never exceed it.
    pub fn capped(value: u32) -> Self {
        Self {
            ideal: value,
            max: value,
        }
    }
}

/// What the display capture request asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConstraints {
    /// Width hint in pixels.
    pub width: IdealMax,
    /// Height hint in pixels.
    pub height: IdealMax,
    /// Frame rate hint.
    pub frame_rate: IdealMax,
    /// Render the pointer into the captured video.
    pub show_cursor: bool,
    /// Request system/tab audio alongside the video.
    pub audio: bool,
}

/// Processing flags for the microphone request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicrophoneConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for MicrophoneConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// Fires when the user stops sharing from the platform's own UI.
///
/// Dropping the notifier without firing it never resolves the receiver,
/// so a released capture cannot be mistaken for a user action.
#[derive(Debug)]
pub struct SharingEnded {
    rx: Option<oneshot::Receiver<()>>,
}

/// Sending half of [`SharingEnded`], held by the display provider.
#[derive(Debug)]
pub struct SharingEndedNotifier {
    tx: oneshot::Sender<()>,
}

impl SharingEnded {
    pub fn channel() -> (SharingEndedNotifier, SharingEnded) {
        let (tx, rx) = oneshot::channel();
        (SharingEndedNotifier { tx }, SharingEnded { rx: Some(rx) })
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        Self { rx: None }
    }

    /// Wait for the user to end sharing. Cancel safe.
    pub async fn recv(&mut self) {
        if let Some(rx) = self.rx.as_mut() {
            let fired = rx.await.is_ok();
            self.rx = None;
            if fired {
                return;
            }
        }
        std::future::pending::<()>().await
    }
}

impl SharingEndedNotifier {
    pub fn notify(self) {
        let _ = self.tx.send(());
    }
}

/// A granted display capture.
#[derive(Debug)]
pub struct DisplayCapture {
    /// One video track plus an optional system-audio track.
    pub stream: MediaStream,
    /// Fires when the user stops sharing.
    pub ended: SharingEnded,
}

/// Screen/window/tab capture.
#[async_trait]
pub trait DisplayCaptureProvider: Send + Sync {
    /// Whether display capture exists on this host at all.
    fn is_available(&self) -> bool;

    async fn request(&self, constraints: &DisplayConstraints) -> ScreenrecResult<DisplayCapture>;
}

/// Microphone capture.
#[async_trait]
pub trait MicrophoneProvider: Send + Sync {
    async fn request(&self, constraints: &MicrophoneConstraints) -> ScreenrecResult<MediaStream>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sharing_ended_fires_on_notify() {
        let (notifier, mut ended) = SharingEnded::channel();
        notifier.notify();
        tokio::time::timeout(Duration::from_secs(1), ended.recv())
            .await
            .expect("notify should resolve the signal");
    }

    #[tokio::test]
    async fn test_dropped_notifier_never_fires() {
        let (notifier, mut ended) = SharingEnded::channel();
        drop(notifier);
        let waited = tokio::time::timeout(Duration::from_millis(50), ended.recv()).await;
        assert!(waited.is_err());
    }

    #[test]
    fn test_constraints_serialize_as_ideal_max() {
        let constraints = DisplayConstraints {
            width: IdealMax::capped(1920),
            height: IdealMax::capped(1080),
            frame_rate: IdealMax::capped(60),
            show_cursor: true,
            audio: true,
        };
        let json = serde_json::to_value(&constraints).unwrap();
        assert_eq!(json["width"]["ideal"], 1920);
        assert_eq!(json["frame_rate"]["max"], 60);
        assert_eq!(json["show_cursor"], true);
    }
}
