//! Recording session state machine.
//!
//! `RecordingSession` owns every session-scoped handle and is driven by
//! three kinds of input: user commands (`begin_start`, `pause`, `resume`,
//! `stop`), the acquisition result (`finish_start`), and platform events
//! (`on_recorder_event`, `on_sharing_ended`). It never blocks; the async
//! parts live in [`crate::controller`]. Every transition is guarded by an
//! explicit check of the current state.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::Utc;
use screenrec_common::clock::{format_elapsed, format_megabytes, RecordingClock};
use screenrec_common::error::{ScreenrecError, ScreenrecResult};
use screenrec_platform_core::{
    ArtifactLink, Platform, PreviewSink, PreviewState, RecorderEvent, RecorderEventSink,
    SharingEnded,
};
use serde::{Deserialize, Serialize};

use crate::acquisition::AcquiredStreams;
use crate::artifact::{ArtifactSummary, ChunkBuffer, OutputArtifact};
use crate::config::{AcquisitionPlan, CaptureConfiguration};
use crate::format::{choose_recorder_options, DEFAULT_MIME};
use crate::mixer::mix_streams;
use crate::prober::{probe, CapabilityReport};
use crate::teardown::SessionResources;

pub const STATUS_IDLE: &str = "Idle";
pub const STATUS_REQUESTING: &str = "Requesting capture…";
pub const STATUS_RECORDING: &str = "Recording";
pub const STATUS_PAUSED: &str = "Paused";
pub const STATUS_STOPPED: &str = "Stopped";
pub const ERROR_PREFIX: &str = "Error: ";

/// State of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session; ready to start.
    Idle,
    /// Waiting for permissions or for the recorder to report that it started.
    Starting,
    /// Recording in progress.
    Recording,
    /// Recording paused.
    Paused,
    /// Recorder finalizing; the artifact follows.
    Stopping,
    /// A failure is being cleaned up. Transient.
    Error,
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Recording => "recording",
            SessionState::Paused => "paused",
            SessionState::Stopping => "stopping",
            SessionState::Error => "error",
        }
    }

    /// Whether a session currently holds resources or is about to.
    pub fn is_active(&self) -> bool {
        !matches!(self, SessionState::Idle | SessionState::Error)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything the UI layer shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// Current lifecycle state.
    pub state: SessionState,
    /// Status line, prefixed with `Error: ` after a failure.
    pub status: String,
    /// Active recording time, excluding pauses.
    pub elapsed: Duration,
    /// `MM:SS`
    pub elapsed_label: String,
    /// Bytes held for the current session.
    pub bytes_recorded: u64,
    /// e.g. `1.0 MB`
    pub size_label: String,
    /// Preferred container, or `No supported container`.
    pub format_label: String,
    /// Capability report lines from the last probe.
    pub capabilities: Vec<String>,
    /// Newest first.
    pub downloads: Vec<ArtifactLink>,
    /// What the preview surface is showing.
    pub preview: PreviewState,
}

/// The single recording session of a controller.
pub struct RecordingSession {
    platform: Platform,
    preview: Box<dyn PreviewSink>,
    chunk_interval: Duration,
    state: SessionState,
    status: String,
    config: Option<CaptureConfiguration>,
    resources: SessionResources,
    chunks: ChunkBuffer,
    clock: Option<RecordingClock>,
    format_label: String,
    report: CapabilityReport,
    downloads: Vec<ArtifactLink>,
    last_artifact: Option<ArtifactSummary>,
}

impl RecordingSession {
    /// Create an idle session and run an initial capability probe.
    ///
    /// A host without display capture leaves the error in the status.
    pub fn new(platform: Platform, preview: Box<dyn PreviewSink>, chunk_interval: Duration) -> Self {
        let report = probe(&platform);
        let format_label = report.format_label();
        let mut session = Self {
            platform,
            preview,
            chunk_interval,
            state: SessionState::Idle,
            status: STATUS_IDLE.to_string(),
            config: None,
            resources: SessionResources::default(),
            chunks: ChunkBuffer::new(),
            clock: None,
            format_label,
            report,
            downloads: Vec::new(),
            last_artifact: None,
        };
        if let Err(e) = session.report.ensure_supported() {
            tracing::error!(error = %e, "Screen capture unavailable");
            session.set_error_status(&e);
        }
        session
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn capability_report(&self) -> &CapabilityReport {
        &self.report
    }

    pub fn format_label(&self) -> &str {
        &self.format_label
    }

    /// Configuration of the session in progress.
    pub fn config(&self) -> Option<&CaptureConfiguration> {
        self.config.as_ref()
    }

    pub fn bytes_recorded(&self) -> u64 {
        self.chunks.total_bytes()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        self.clock
            .as_ref()
            .map(|clock| clock.elapsed_at(now))
            .unwrap_or_default()
    }

    /// Export links of every completed session, newest first.
    pub fn downloads(&self) -> &[ArtifactLink] {
        &self.downloads
    }

    /// Metadata of the most recent artifact. The payload itself only lives
    /// with the exporter.
    pub fn last_artifact(&self) -> Option<&ArtifactSummary> {
        self.last_artifact.as_ref()
    }

    pub fn preview_state(&self) -> PreviewState {
        self.preview.state()
    }

    /// Whether every session handle has been released.
    pub fn resources_released(&self) -> bool {
        self.resources.is_clear()
    }

    /// Leave `Idle` and return the permission requests to issue.
    ///
    /// Fails with `SessionBusy` outside `Idle`, and with
    /// `UnsupportedPlatform` (staying `Idle`) when display capture is
    /// missing.
    pub fn begin_start(&mut self, config: CaptureConfiguration) -> ScreenrecResult<AcquisitionPlan> {
        if self.state != SessionState::Idle {
            return Err(ScreenrecError::busy(format!(
                "A session is already {}",
                self.state
            )));
        }

        self.report = probe(&self.platform);
        self.format_label = self.report.format_label();
        if let Err(e) = self.report.ensure_supported() {
            tracing::error!(error = %e, "Start refused");
            self.set_error_status(&e);
            return Err(e);
        }

        tracing::info!(
            width = config.width,
            height = config.height,
            fps = config.frame_rate,
            bitrate_kbps = config.effective_bitrate_kbps(),
            system_audio = config.include_system_audio,
            microphone = config.include_microphone,
            "Starting recording session"
        );

        let plan = config.acquisition_plan();
        self.config = Some(config);
        self.state = SessionState::Starting;
        self.set_status(STATUS_REQUESTING);
        Ok(plan)
    }

    /// Consume the acquisition result: mix, build and start the recorder.
    ///
    /// Returns the sharing-ended signal of the granted display. On any
    /// failure the session is torn down and the error returned.
    pub fn finish_start(
        &mut self,
        acquired: ScreenrecResult<AcquiredStreams>,
        events: RecorderEventSink,
    ) -> ScreenrecResult<SharingEnded> {
        if self.state != SessionState::Starting {
            if let Ok(streams) = acquired {
                tracing::info!(state = %self.state, "Discarding capture granted after cancellation");
                let mut orphan = SessionResources {
                    display: Some(streams.display),
                    microphone: streams.microphone,
                    ..Default::default()
                };
                orphan.release();
            }
            return Err(ScreenrecError::capture("Start was cancelled"));
        }

        let streams = match acquired {
            Ok(streams) => streams,
            Err(e) => return Err(self.fail(e)),
        };

        tracing::info!(
            audio_sources = streams.audio_source_count(),
            "Capture granted"
        );

        let AcquiredStreams {
            display,
            microphone,
            ended,
        } = streams;
        self.resources.display = Some(display);
        self.resources.microphone = microphone;
        self.chunks.reset();
        self.clock = None;

        match self.start_recorder(events) {
            Ok(()) => Ok(ended),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn start_recorder(&mut self, events: RecorderEventSink) -> ScreenrecResult<()> {
        let bitrate_bps = self
            .config
            .as_ref()
            .map(CaptureConfiguration::target_bitrate_bps)
            .unwrap_or_else(|| CaptureConfiguration::default().target_bitrate_bps());

        let display = self
            .resources
            .display
            .as_ref()
            .ok_or_else(|| ScreenrecError::capture("Display capture was released"))?;
        let mixed = mix_streams(
            display,
            self.resources.microphone.as_ref(),
            self.platform.audio.as_ref(),
        )?;
        self.resources.audio_context = mixed.context;
        self.preview.show_live(&mixed.stream);

        let options = choose_recorder_options(self.platform.recorder.as_ref(), bitrate_bps);
        if let Some(mime) = options.mime_type.as_ref() {
            self.format_label = mime.clone();
        }

        let recorder = self
            .platform
            .recorder
            .create(&mixed.stream, &options, events)
            .map_err(|e| match e {
                ScreenrecError::RecorderConstructionFailed { .. } => e,
                other => ScreenrecError::recorder(other.user_message()),
            })?;
        self.resources.mixed = Some(mixed.stream);
        let recorder = self.resources.recorder.insert(recorder);

        tracing::info!(
            mime = %recorder.mime_type(),
            bitrate_bps,
            interval_ms = self.chunk_interval.as_millis() as u64,
            "Recorder created"
        );

        recorder
            .start(self.chunk_interval)
            .map_err(|e| ScreenrecError::recorder(format!("Recorder failed to start: {}", e.user_message())))
    }

    /// Apply a recorder lifecycle event.
    pub fn on_recorder_event(&mut self, event: RecorderEvent) {
        match event {
            RecorderEvent::Started => {
                if self.state == SessionState::Starting {
                    self.clock = Some(RecordingClock::start());
                    self.state = SessionState::Recording;
                    self.set_status(STATUS_RECORDING);
                    tracing::info!("Recording started");
                }
            }
            RecorderEvent::Data(chunk) => {
                if self.resources.recorder.is_none() {
                    tracing::debug!(bytes = chunk.len(), "Dropping chunk without an active recorder");
                    return;
                }
                let bytes = chunk.len();
                if self.chunks.push(chunk) {
                    tracing::trace!(
                        bytes,
                        total = self.chunks.total_bytes(),
                        chunks = self.chunks.len(),
                        "Chunk recorded"
                    );
                }
            }
            RecorderEvent::Paused => {
                if self.state == SessionState::Paused {
                    self.set_status(STATUS_PAUSED);
                }
            }
            RecorderEvent::Resumed => {
                if self.state == SessionState::Recording {
                    self.set_status(STATUS_RECORDING);
                }
            }
            RecorderEvent::Stopped => match self.state {
                SessionState::Stopping | SessionState::Recording | SessionState::Paused => {
                    self.finalize();
                }
                SessionState::Starting => {
                    self.fail(ScreenrecError::recorder("Recorder stopped before it started"));
                }
                SessionState::Idle | SessionState::Error => {}
            },
            RecorderEvent::Error(message) => {
                if self.state.is_active() {
                    self.fail(ScreenrecError::capture(format!("Recorder error: {message}")));
                }
            }
        }
    }

    /// Pause. Only legal from `Recording`; returns whether it applied.
    pub fn pause(&mut self) -> bool {
        self.pause_at(Instant::now())
    }

    pub fn pause_at(&mut self, now: Instant) -> bool {
        if self.state != SessionState::Recording {
            return false;
        }
        let Some(recorder) = self.resources.recorder.as_mut() else {
            return false;
        };
        if let Err(e) = recorder.pause() {
            tracing::warn!(error = %e, "Recorder refused to pause");
            return false;
        }
        if let Some(clock) = self.clock.as_mut() {
            clock.pause_at(now);
        }
        self.state = SessionState::Paused;
        tracing::info!("Recording paused");
        true
    }

    /// Resume. Only legal from `Paused`; returns whether it applied.
    pub fn resume(&mut self) -> bool {
        self.resume_at(Instant::now())
    }

    pub fn resume_at(&mut self, now: Instant) -> bool {
        if self.state != SessionState::Paused {
            return false;
        }
        let Some(recorder) = self.resources.recorder.as_mut() else {
            return false;
        };
        if let Err(e) = recorder.resume() {
            tracing::warn!(error = %e, "Recorder refused to resume");
            return false;
        }
        if let Some(clock) = self.clock.as_mut() {
            clock.resume_at(now);
        }
        self.state = SessionState::Recording;
        tracing::info!("Recording resumed");
        true
    }

    /// Stop. Only legal from `Recording` or `Paused`; returns whether it
    /// applied. The artifact is produced when the recorder reports
    /// `Stopped`.
    pub fn stop(&mut self) -> bool {
        if !matches!(self.state, SessionState::Recording | SessionState::Paused) {
            return false;
        }
        self.state = SessionState::Stopping;
        if let Some(clock) = self.clock.as_mut() {
            clock.pause();
        }
        tracing::info!(elapsed_secs = self.elapsed().as_secs_f64(), "Stopping recording");

        let stopped = match self.resources.recorder.as_mut() {
            Some(recorder) => recorder.stop(),
            None => Err(ScreenrecError::recorder("No recorder to stop")),
        };
        if let Err(e) = stopped {
            tracing::warn!(error = %e, "Recorder did not stop cleanly; finalizing with chunks so far");
            self.finalize();
        }
        true
    }

    /// The user ended sharing from the platform UI.
    pub fn on_sharing_ended(&mut self) {
        match self.state {
            SessionState::Recording | SessionState::Paused => {
                tracing::info!("Screen sharing ended by user");
                self.stop();
            }
            SessionState::Starting => {
                self.fail(ScreenrecError::capture(
                    "Screen sharing ended before recording started",
                ));
            }
            SessionState::Idle | SessionState::Stopping | SessionState::Error => {}
        }
    }

    /// Release everything without producing an artifact.
    pub fn shutdown(&mut self) {
        if self.state != SessionState::Idle {
            tracing::info!(state = %self.state, "Shutting down active session");
        }
        self.teardown();
    }

    /// Release every resource and return to `Idle`. Idempotent.
    ///
    /// The status is reset to `Idle` unless it holds an error.
    pub fn teardown(&mut self) {
        self.resources.release();
        self.clock = None;
        self.config = None;
        if matches!(self.preview.state(), PreviewState::Live { .. }) {
            self.preview.clear();
        }
        if self.state != SessionState::Idle {
            tracing::debug!(from = %self.state, "Session torn down");
        }
        self.state = SessionState::Idle;
        if !self.status.starts_with(ERROR_PREFIX) {
            self.set_status(STATUS_IDLE);
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let elapsed = self.elapsed();
        let bytes = self.chunks.total_bytes();
        SessionSnapshot {
            state: self.state,
            status: self.status.clone(),
            elapsed,
            elapsed_label: format_elapsed(elapsed),
            bytes_recorded: bytes,
            size_label: format_megabytes(bytes),
            format_label: self.format_label.clone(),
            capabilities: self.report.lines(),
            downloads: self.downloads.clone(),
            preview: self.preview.state(),
        }
    }

    fn finalize(&mut self) {
        self.clock = None;
        self.set_status(STATUS_STOPPED);

        let mime = self
            .resources
            .recorder
            .as_ref()
            .map(|r| r.mime_type())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MIME.to_string());
        let artifact = OutputArtifact::assemble(&mut self.chunks, &mime, Utc::now());

        match self
            .platform
            .exporter
            .export(&artifact.data, &artifact.mime_type, &artifact.filename)
        {
            Ok(link) => {
                tracing::info!(
                    filename = %link.filename,
                    bytes = artifact.len(),
                    mime = %artifact.mime_type,
                    "Recording finished"
                );
                self.preview.show_artifact(&link);
                self.downloads.insert(0, link);
            }
            Err(e) => {
                let e = ScreenrecError::capture(format!(
                    "Failed to export recording: {}",
                    e.user_message()
                ));
                tracing::error!(error = %e, "Export failed");
                self.set_error_status(&e);
            }
        }
        self.last_artifact = Some(artifact.summary());

        self.teardown();
    }

    fn fail(&mut self, error: ScreenrecError) -> ScreenrecError {
        tracing::error!(error = %error, state = %self.state, "Recording session failed");
        self.state = SessionState::Error;
        self.set_error_status(&error);
        self.teardown();
        error
    }

    fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }

    fn set_error_status(&mut self, error: &ScreenrecError) {
        self.status = format!("{ERROR_PREFIX}{}", error.user_message());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::acquire_streams;
    use screenrec_platform_core::{HeadlessPreview, RecorderEventStream, RecorderState};
    use screenrec_platform_synthetic::{
        DisplayOutcome, MemoryExporter, MicrophoneOutcome, SyntheticPlatform,
    };
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn session_for(synthetic: &SyntheticPlatform) -> RecordingSession {
        RecordingSession::new(
            synthetic.platform(),
            Box::new(HeadlessPreview::new()),
            Duration::from_millis(1000),
        )
    }

    async fn start(
        synthetic: &SyntheticPlatform,
        session: &mut RecordingSession,
        config: CaptureConfiguration,
    ) -> ScreenrecResult<RecorderEventStream> {
        let plan = session.begin_start(config)?;
        let platform = synthetic.platform();
        let acquired =
            acquire_streams(platform.display.as_ref(), platform.microphone.as_ref(), &plan).await;
        let (tx, rx) = mpsc::unbounded_channel();
        session.finish_start(acquired, tx)?;
        Ok(rx)
    }

    fn drain(session: &mut RecordingSession, events: &mut RecorderEventStream) {
        while let Ok(event) = events.try_recv() {
            session.on_recorder_event(event);
        }
    }

    async fn recording(
        synthetic: &SyntheticPlatform,
    ) -> (RecordingSession, RecorderEventStream) {
        let mut session = session_for(synthetic);
        let mut events = start(synthetic, &mut session, CaptureConfiguration::default())
            .await
            .unwrap();
        drain(&mut session, &mut events);
        assert_eq!(session.state(), SessionState::Recording);
        (session, events)
    }

    #[tokio::test]
    async fn test_full_session_produces_one_artifact() {
        let synthetic = SyntheticPlatform::default();
        let mut session = session_for(&synthetic);
        let config = CaptureConfiguration {
            width: 1920,
            height: 1080,
            frame_rate: 60,
            target_bitrate_kbps: 12_000,
            include_system_audio: true,
            include_microphone: false,
        };

        let mut events = start(&synthetic, &mut session, config).await.unwrap();
        assert_eq!(session.state(), SessionState::Starting);
        assert_eq!(session.status(), STATUS_REQUESTING);

        drain(&mut session, &mut events);
        assert_eq!(session.state(), SessionState::Recording);
        assert_eq!(session.status(), STATUS_RECORDING);
        assert!(matches!(session.preview_state(), PreviewState::Live { .. }));

        let recorder = synthetic.recorder().unwrap();
        assert_eq!(
            recorder.options().mime_type.as_deref(),
            Some("video/webm;codecs=vp9,opus")
        );
        assert_eq!(recorder.options().video_bits_per_second, 12_000_000);
        assert_eq!(recorder.timeslice(), Some(Duration::from_millis(1000)));

        let constraints = synthetic.last_display_constraints().unwrap();
        assert_eq!(constraints.width.max, 1920);
        assert_eq!(constraints.frame_rate.ideal, 60);
        assert!(constraints.audio);

        recorder.emit(vec![1; 500_000]);
        recorder.set_final_chunk(vec![2; 520_000]);
        drain(&mut session, &mut events);

        assert!(session.stop());
        assert_eq!(session.state(), SessionState::Stopping);
        drain(&mut session, &mut events);

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.status(), STATUS_IDLE);
        assert_eq!(session.downloads().len(), 1);

        let artifact = session.last_artifact().unwrap();
        assert_eq!(artifact.size_bytes, 1_020_000);
        assert!(artifact.filename.starts_with("screen-"));
        assert!(artifact.filename.ends_with(".webm"));
        assert_eq!(artifact.mime_type, "video/webm;codecs=vp9,opus");

        let snapshot = session.snapshot();
        assert_eq!(snapshot.size_label, "1.0 MB");
        assert_eq!(snapshot.elapsed_label, "00:00");
        assert!(matches!(
            snapshot.preview,
            PreviewState::Artifact { controls: true, .. }
        ));

        assert!(session.resources_released());
        assert!(synthetic.all_tracks_stopped());
        assert_eq!(synthetic.open_contexts(), 0);
        assert_eq!(synthetic.memory_exporter().artifacts()[0].data.len(), 1_020_000);
    }

    #[tokio::test]
    async fn test_pause_and_resume_only_apply_in_order() {
        let synthetic = SyntheticPlatform::default();
        let mut idle = session_for(&synthetic);
        assert!(!idle.pause());
        assert!(!idle.resume());
        assert!(!idle.stop());

        let (mut session, mut events) = recording(&synthetic).await;
        assert!(!session.resume());
        assert!(session.pause());
        assert!(!session.pause());
        assert_eq!(session.state(), SessionState::Paused);
        drain(&mut session, &mut events);
        assert_eq!(session.status(), STATUS_PAUSED);

        let frozen = session.elapsed();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(session.elapsed(), frozen);

        assert!(session.resume());
        drain(&mut session, &mut events);
        assert_eq!(session.state(), SessionState::Recording);
        assert_eq!(session.status(), STATUS_RECORDING);
        assert_eq!(synthetic.recorder().unwrap().state(), RecorderState::Recording);
    }

    #[tokio::test]
    async fn test_immediate_resume_keeps_bytes_and_elapsed() {
        let synthetic = SyntheticPlatform::default();
        let (mut session, mut events) = recording(&synthetic).await;
        synthetic.recorder().unwrap().emit(vec![7; 4_096]);
        drain(&mut session, &mut events);

        let at = Instant::now() + Duration::from_secs(3);
        let bytes = session.bytes_recorded();
        let elapsed = session.elapsed_at(at);
        assert_eq!(bytes, 4_096);
        assert!(elapsed >= Duration::from_secs(2));

        assert!(session.pause_at(at));
        drain(&mut session, &mut events);
        assert!(session.resume_at(at));
        drain(&mut session, &mut events);

        assert_eq!(session.state(), SessionState::Recording);
        assert_eq!(session.bytes_recorded(), bytes);
        assert_eq!(session.elapsed_at(at), elapsed);
        assert_eq!(session.snapshot().bytes_recorded, bytes);
    }

    #[tokio::test]
    async fn test_second_start_is_busy() {
        let synthetic = SyntheticPlatform::default();
        let (mut session, _events) = recording(&synthetic).await;

        let err = session.begin_start(CaptureConfiguration::default()).unwrap_err();
        assert!(matches!(err, ScreenrecError::SessionBusy { .. }));
        assert_eq!(session.state(), SessionState::Recording);
        assert_eq!(synthetic.display_requests(), 1);
    }

    #[test]
    fn test_unsupported_platform_stays_idle() {
        let synthetic = SyntheticPlatform::builder().display_available(false).build();
        let mut session = session_for(&synthetic);
        assert!(session.status().starts_with(ERROR_PREFIX));

        let err = session.begin_start(CaptureConfiguration::default()).unwrap_err();
        assert!(matches!(err, ScreenrecError::UnsupportedPlatform { .. }));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(synthetic.display_requests(), 0);
    }

    #[tokio::test]
    async fn test_display_denial_reports_and_releases() {
        let synthetic = SyntheticPlatform::builder()
            .display(DisplayOutcome::Deny)
            .build();
        let mut session = session_for(&synthetic);

        let err = start(&synthetic, &mut session, CaptureConfiguration::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScreenrecError::PermissionDenied { .. }));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.status().starts_with(ERROR_PREFIX));
        assert_eq!(synthetic.recorders_created(), 0);
        assert!(session.resources_released());
    }

    #[tokio::test]
    async fn test_microphone_denial_keeps_recording() {
        let synthetic = SyntheticPlatform::builder()
            .microphone(MicrophoneOutcome::Deny)
            .build();
        let mut session = session_for(&synthetic);
        let config = CaptureConfiguration {
            include_microphone: true,
            ..Default::default()
        };

        let mut events = start(&synthetic, &mut session, config).await.unwrap();
        drain(&mut session, &mut events);
        assert_eq!(session.state(), SessionState::Recording);
        assert_eq!(synthetic.microphone_requests(), 1);
        assert_eq!(synthetic.contexts_created(), 1);
    }

    #[tokio::test]
    async fn test_video_only_session_creates_no_audio_context() {
        let synthetic = SyntheticPlatform::builder()
            .display(DisplayOutcome::Grant { system_audio: false })
            .build();
        let (mut session, mut events) = recording(&synthetic).await;
        assert_eq!(synthetic.contexts_created(), 0);

        assert!(session.stop());
        drain(&mut session, &mut events);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(synthetic.all_tracks_stopped());
    }

    #[tokio::test]
    async fn test_recorder_construction_failure_releases_streams() {
        let synthetic = SyntheticPlatform::builder()
            .fail_recorder_construction()
            .build();
        let mut session = session_for(&synthetic);
        let config = CaptureConfiguration {
            include_microphone: true,
            ..Default::default()
        };

        let err = start(&synthetic, &mut session, config).await.unwrap_err();
        assert!(matches!(err, ScreenrecError::RecorderConstructionFailed { .. }));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.status().starts_with(ERROR_PREFIX));
        assert!(synthetic.all_tracks_stopped());
        assert_eq!(synthetic.open_contexts(), 0);
        assert_eq!(session.preview_state(), PreviewState::Empty);
    }

    #[tokio::test]
    async fn test_recorder_error_discards_chunks() {
        let synthetic = SyntheticPlatform::default();
        let (mut session, mut events) = recording(&synthetic).await;
        let recorder = synthetic.recorder().unwrap();

        recorder.emit(vec![7; 64]);
        recorder.fail("encoder crashed");
        drain(&mut session, &mut events);

        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.status().contains("encoder crashed"));
        assert!(session.downloads().is_empty());
        assert!(session.resources_released());
        assert!(synthetic.all_tracks_stopped());
    }

    #[tokio::test]
    async fn test_sharing_ended_finalizes_like_stop() {
        let synthetic = SyntheticPlatform::default();
        let (mut session, mut events) = recording(&synthetic).await;
        synthetic.recorder().unwrap().emit(vec![3; 10]);
        drain(&mut session, &mut events);

        session.on_sharing_ended();
        assert_eq!(session.state(), SessionState::Stopping);
        drain(&mut session, &mut events);

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.last_artifact().map(|a| a.size_bytes), Some(10));
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        let synthetic = SyntheticPlatform::default();
        let (mut session, _events) = recording(&synthetic).await;

        session.teardown();
        session.teardown();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.resources_released());
        assert!(synthetic.all_tracks_stopped());
        assert_eq!(synthetic.open_contexts(), 0);
    }

    #[tokio::test]
    async fn test_teardown_continues_past_release_failures() {
        let synthetic = SyntheticPlatform::builder()
            .fail_display_track_stop()
            .build();
        let mut session = session_for(&synthetic);
        let config = CaptureConfiguration {
            include_microphone: true,
            ..Default::default()
        };
        let mut events = start(&synthetic, &mut session, config).await.unwrap();
        drain(&mut session, &mut events);

        session.shutdown();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.resources_released());
        assert_eq!(synthetic.live_tracks().len(), 1);
        assert_eq!(synthetic.open_contexts(), 0);
    }

    #[tokio::test]
    async fn test_failed_recorder_stop_keeps_recorded_chunks() {
        let synthetic = SyntheticPlatform::builder().fail_recorder_stop().build();
        let (mut session, mut events) = recording(&synthetic).await;
        synthetic.recorder().unwrap().emit(vec![5; 100]);
        drain(&mut session, &mut events);

        assert!(session.stop());
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.last_artifact().map(|a| a.size_bytes), Some(100));
        assert_eq!(session.downloads().len(), 1);
    }

    #[tokio::test]
    async fn test_late_chunks_are_ignored() {
        let synthetic = SyntheticPlatform::default();
        let (mut session, _events) = recording(&synthetic).await;
        session.shutdown();

        session.on_recorder_event(RecorderEvent::Data(vec![0; 32]));
        session.on_recorder_event(RecorderEvent::Stopped);
        assert_eq!(session.bytes_recorded(), 0);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.downloads().is_empty());
    }

    #[tokio::test]
    async fn test_export_failure_is_reported() {
        let synthetic = SyntheticPlatform::builder()
            .exporter(Arc::new(MemoryExporter::failing()))
            .build();
        let (mut session, mut events) = recording(&synthetic).await;
        synthetic.recorder().unwrap().emit(vec![1; 8]);

        assert!(session.stop());
        drain(&mut session, &mut events);

        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.status().starts_with(ERROR_PREFIX));
        assert!(session.downloads().is_empty());
        assert_eq!(session.last_artifact().map(|a| a.size_bytes), Some(8));
    }

    #[tokio::test]
    async fn test_new_start_clears_previous_error() {
        let synthetic = SyntheticPlatform::default();
        let (mut session, mut events) = recording(&synthetic).await;
        synthetic.recorder().unwrap().fail("boom");
        drain(&mut session, &mut events);
        assert!(session.status().starts_with(ERROR_PREFIX));

        session.begin_start(CaptureConfiguration::default()).unwrap();
        assert_eq!(session.status(), STATUS_REQUESTING);
    }

    #[tokio::test]
    async fn test_downloads_are_newest_first() {
        let synthetic = SyntheticPlatform::default();
        let mut session = session_for(&synthetic);

        for size in [4usize, 9] {
            let mut events = start(&synthetic, &mut session, CaptureConfiguration::default())
                .await
                .unwrap();
            drain(&mut session, &mut events);
            synthetic.recorder().unwrap().emit(vec![0; size]);
            drain(&mut session, &mut events);
            session.stop();
            drain(&mut session, &mut events);
        }

        let sizes: Vec<u64> = session.downloads().iter().map(|d| d.size_bytes).collect();
        assert_eq!(sizes, vec![9, 4]);
    }
}
