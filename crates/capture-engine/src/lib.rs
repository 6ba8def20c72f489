//! Screenrec Capture Engine
//!
//! Drives one screen recording session at a time: probes what the host can
//! do, acquires the display (and optionally the microphone), mixes audio,
//! runs the recorder, and assembles the recorded chunks into a single
//! downloadable artifact. All platform access goes through the traits in
//! `screenrec-platform-core`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                SessionController                  │
//! │  ┌──────────┐   ┌──────────────────────────────┐  │
//! │  │ Prober   │   │      RecordingSession        │  │
//! │  └──────────┘   │  Idle → Starting → Recording │  │
//! │  ┌──────────┐   │            ⇅ Paused          │  │
//! │  │Acquisition──►│  Stopping → Idle  (Error)    │  │
//! │  └──────────┘   └──────┬────────────┬──────────┘  │
//! │                        ▼            ▼             │
//! │                 ┌──────────┐  ┌───────────┐       │
//! │                 │  Mixer   │  │ Recorder  │       │
//! │                 └──────────┘  └─────┬─────┘       │
//! │                                     ▼             │
//! │                  ChunkBuffer → OutputArtifact     │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod acquisition;
pub mod artifact;
pub mod config;
pub mod controller;
pub mod format;
pub mod mixer;
pub mod prober;
pub mod session;
pub mod teardown;

pub use acquisition::{acquire_streams, AcquiredStreams};
pub use artifact::{
    artifact_filename, ArtifactSummary, ChunkBuffer, DirectoryExporter, OutputArtifact,
};
pub use config::{AcquisitionPlan, CaptureConfiguration};
pub use controller::{ControllerConfig, SessionController, SessionHandle};
pub use format::{choose_recorder_options, file_extension, DEFAULT_MIME};
pub use mixer::{mix_streams, MixedOutput};
pub use prober::{probe, CapabilityReport, FormatSupport};
pub use session::*;
pub use teardown::SessionResources;
