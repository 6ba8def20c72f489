//! Screenrec platform core contracts.
//!
//! The session controller drives platform capture and record primitives it
//! does not own: display capture, microphone capture, an audio mixing
//! graph, a chunking media recorder, a preview surface, and an artifact
//! exporter. This crate defines those collaborators as traits plus the
//! plain data they exchange, without coupling to a concrete backend.

pub mod audio;
pub mod capability;
pub mod display;
pub mod output;
pub mod recorder;
pub mod track;

pub use audio::*;
pub use capability::*;
pub use display::*;
pub use output::*;
pub use recorder::*;
pub use track::*;

use std::sync::Arc;

/// Every collaborator a recording session needs, bundled for injection.
#[derive(Clone)]
pub struct Platform {
    pub display: Arc<dyn DisplayCaptureProvider>,
    pub microphone: Arc<dyn MicrophoneProvider>,
    pub audio: Arc<dyn AudioGraphProvider>,
    pub recorder: Arc<dyn RecorderBackend>,
    pub exporter: Arc<dyn ArtifactExporter>,
}
