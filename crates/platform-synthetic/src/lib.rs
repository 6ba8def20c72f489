//! Screenrec synthetic platform
//!
//! An in-process implementation of every `screenrec-platform-core`
//! contract:
//! - **Display/microphone:** scripted grant or denial, optional gated prompt
//! - **Audio graph:** tracks which contexts are still open
//! - **Recorder:** emits chunks on its own clock, or only on demand
//! - **Exporter:** keeps artifacts in memory behind `blob:` URLs
//!
//! Every handle it gives out stays inspectable, so tests can check that a
//! session released what it acquired.

pub mod audio;
pub mod display;
pub mod exporter;
pub mod recorder;
pub mod track;

pub use exporter::{MemoryExporter, StoredArtifact};
pub use recorder::RecorderHandle;
pub use track::SyntheticTrack;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use screenrec_platform_core::{
    ArtifactExporter, DisplayConstraints, Platform, SharingEndedNotifier, TrackKind,
};
use tokio::sync::Notify;

/// What the display consent prompt resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayOutcome {
    /// Grant a video track, plus system audio when requested and allowed.
    Grant { system_audio: bool },
    /// The user dismissed the prompt.
    Deny,
    /// The request is refused as unsupported.
    Unsupported,
    /// A malformed grant with no video track.
    GrantAudioOnly,
}

/// What the microphone prompt resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicrophoneOutcome {
    Grant,
    Deny,
    Unavailable,
}

/// How the recorder produces data while recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkPlan {
    /// Only chunks pushed through [`RecorderHandle::emit`].
    Manual,
    /// A chunk of this many bytes every timeslice.
    Fixed(usize),
    /// Chunks sized from the configured bitrate.
    Bitrate,
}

/// Behaviour of a [`SyntheticPlatform`].
#[derive(Debug, Clone)]
pub struct SyntheticOptions {
    pub display_available: bool,
    pub recorder_available: bool,
    pub supported_types: Vec<String>,
    /// Type negotiated when the recorder is built without one.
    pub default_mime: String,
    pub display: DisplayOutcome,
    pub microphone: MicrophoneOutcome,
    pub chunks: ChunkPlan,
    /// Hold display requests until [`SyntheticPlatform::release_prompt`].
    pub gate_display_prompt: bool,
    pub fail_recorder_construction: bool,
    pub fail_recorder_stop: bool,
    pub fail_audio_context: bool,
    pub fail_display_track_stop: bool,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            display_available: true,
            recorder_available: true,
            supported_types: vec![
                "video/webm;codecs=vp9,opus".to_string(),
                "video/webm;codecs=vp8,opus".to_string(),
                "video/webm;codecs=vp9".to_string(),
                "video/webm".to_string(),
            ],
            default_mime: "video/webm".to_string(),
            display: DisplayOutcome::Grant { system_audio: true },
            microphone: MicrophoneOutcome::Grant,
            chunks: ChunkPlan::Manual,
            gate_display_prompt: false,
            fail_recorder_construction: false,
            fail_recorder_stop: false,
            fail_audio_context: false,
            fail_display_track_stop: false,
        }
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    tracks: Vec<Arc<SyntheticTrack>>,
    notifiers: Vec<SharingEndedNotifier>,
    contexts: Vec<Arc<AtomicBool>>,
    recorders: Vec<RecorderHandle>,
    display_requests: usize,
    microphone_requests: usize,
    last_display: Option<DisplayConstraints>,
}

pub(crate) struct Shared {
    pub(crate) options: SyntheticOptions,
    pub(crate) prompt: Notify,
    registry: Mutex<Registry>,
}

impl Shared {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn new_track(&self, kind: TrackKind, label: &str, failing: bool) -> Arc<SyntheticTrack> {
        let mut registry = self.registry();
        registry.next_id += 1;
        let prefix = match kind {
            TrackKind::Video => "video",
            TrackKind::Audio => "audio",
        };
        let track = SyntheticTrack::new(format!("{prefix}-{}", registry.next_id), kind, label);
        let track = Arc::new(if failing { track.failing() } else { track });
        registry.tracks.push(track.clone());
        track
    }

    pub(crate) fn record_display_request(&self, constraints: &DisplayConstraints) {
        let mut registry = self.registry();
        registry.display_requests += 1;
        registry.last_display = Some(constraints.clone());
    }

    pub(crate) fn record_microphone_request(&self) {
        self.registry().microphone_requests += 1;
    }

    pub(crate) fn add_notifier(&self, notifier: SharingEndedNotifier) {
        self.registry().notifiers.push(notifier);
    }

    pub(crate) fn register_context(&self) -> Arc<AtomicBool> {
        let closed = Arc::new(AtomicBool::new(false));
        self.registry().contexts.push(closed.clone());
        closed
    }

    pub(crate) fn register_recorder(&self, handle: RecorderHandle) {
        self.registry().recorders.push(handle);
    }
}

/// Builder for [`SyntheticPlatform`].
#[derive(Default)]
pub struct SyntheticPlatformBuilder {
    options: SyntheticOptions,
    exporter: Option<Arc<dyn ArtifactExporter>>,
}

impl SyntheticPlatformBuilder {
    pub fn display_available(mut self, available: bool) -> Self {
        self.options.display_available = available;
        self
    }

    pub fn recorder_available(mut self, available: bool) -> Self {
        self.options.recorder_available = available;
        self
    }

    pub fn supported_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.supported_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_mime(mut self, mime: impl Into<String>) -> Self {
        self.options.default_mime = mime.into();
        self
    }

    pub fn display(mut self, outcome: DisplayOutcome) -> Self {
        self.options.display = outcome;
        self
    }

    pub fn microphone(mut self, outcome: MicrophoneOutcome) -> Self {
        self.options.microphone = outcome;
        self
    }

    pub fn chunks(mut self, plan: ChunkPlan) -> Self {
        self.options.chunks = plan;
        self
    }

    pub fn gate_display_prompt(mut self) -> Self {
        self.options.gate_display_prompt = true;
        self
    }

    pub fn fail_recorder_construction(mut self) -> Self {
        self.options.fail_recorder_construction = true;
        self
    }

    pub fn fail_recorder_stop(mut self) -> Self {
        self.options.fail_recorder_stop = true;
        self
    }

    pub fn fail_audio_context(mut self) -> Self {
        self.options.fail_audio_context = true;
        self
    }

    pub fn fail_display_track_stop(mut self) -> Self {
        self.options.fail_display_track_stop = true;
        self
    }

    /// Export through `exporter` instead of the in-memory one.
    pub fn exporter(mut self, exporter: Arc<dyn ArtifactExporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn build(self) -> SyntheticPlatform {
        let memory = Arc::new(MemoryExporter::new());
        SyntheticPlatform {
            shared: Arc::new(Shared {
                options: self.options,
                prompt: Notify::new(),
                registry: Mutex::new(Registry::default()),
            }),
            exporter: self
                .exporter
                .unwrap_or_else(|| memory.clone() as Arc<dyn ArtifactExporter>),
            memory,
        }
    }
}

/// A fully scripted host.
#[derive(Clone)]
pub struct SyntheticPlatform {
    shared: Arc<Shared>,
    exporter: Arc<dyn ArtifactExporter>,
    memory: Arc<MemoryExporter>,
}

impl Default for SyntheticPlatform {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SyntheticPlatform {
    pub fn builder() -> SyntheticPlatformBuilder {
        SyntheticPlatformBuilder::default()
    }

    pub fn options(&self) -> &SyntheticOptions {
        &self.shared.options
    }

    /// The collaborators to hand to a session.
    pub fn platform(&self) -> Platform {
        Platform {
            display: Arc::new(display::SyntheticDisplay::new(self.shared.clone())),
            microphone: Arc::new(display::SyntheticMicrophone::new(self.shared.clone())),
            audio: Arc::new(audio::SyntheticAudioGraph::new(self.shared.clone())),
            recorder: Arc::new(recorder::SyntheticRecorderBackend::new(self.shared.clone())),
            exporter: self.exporter.clone(),
        }
    }

    /// Let one gated display prompt resolve.
    pub fn release_prompt(&self) {
        self.shared.prompt.notify_one();
    }

    /// Stop sharing from the platform UI. Returns whether anyone was told.
    pub fn end_sharing(&self) -> bool {
        let notifiers: Vec<_> = self.shared.registry().notifiers.drain(..).collect();
        let notified = !notifiers.is_empty();
        for notifier in notifiers {
            notifier.notify();
        }
        notified
    }

    /// The most recently created recorder.
    pub fn recorder(&self) -> Option<RecorderHandle> {
        self.shared.registry().recorders.last().cloned()
    }

    pub fn recorders_created(&self) -> usize {
        self.shared.registry().recorders.len()
    }

    pub fn display_requests(&self) -> usize {
        self.shared.registry().display_requests
    }

    pub fn microphone_requests(&self) -> usize {
        self.shared.registry().microphone_requests
    }

    pub fn last_display_constraints(&self) -> Option<DisplayConstraints> {
        self.shared.registry().last_display.clone()
    }

    /// Every track handed out so far.
    pub fn tracks(&self) -> Vec<Arc<SyntheticTrack>> {
        self.shared.registry().tracks.clone()
    }

    /// Ids of tracks that are still live.
    pub fn live_tracks(&self) -> Vec<String> {
        use screenrec_platform_core::MediaTrack;
        self.shared
            .registry()
            .tracks
            .iter()
            .filter(|t| t.is_live())
            .map(|t| t.id().to_string())
            .collect()
    }

    pub fn all_tracks_stopped(&self) -> bool {
        self.live_tracks().is_empty()
    }

    pub fn contexts_created(&self) -> usize {
        self.shared.registry().contexts.len()
    }

    pub fn open_contexts(&self) -> usize {
        self.shared
            .registry()
            .contexts
            .iter()
            .filter(|closed| !closed.load(Ordering::SeqCst))
            .count()
    }

    /// The built-in exporter. Empty when another exporter was configured.
    pub fn memory_exporter(&self) -> &MemoryExporter {
        &self.memory
    }
}
