//! Async driver for a [`RecordingSession`].
//!
//! One tokio task owns the session. Commands from any number of
//! [`SessionHandle`]s, recorder events, the sharing-ended signal, the
//! acquisition result and the UI refresh tick are all serialised through
//! that task, so the state machine needs no locking.
//!
//! ```text
//!  SessionHandle ──commands──┐
//!  acquisition task ─result──┤
//!  recorder ───────events────┼──► ControllerTask ──► RecordingSession
//!  display track ──ended─────┤          │
//!  UI ticker ────────────────┘          └──► watch<SessionSnapshot>
//! ```

use std::future::pending;
use std::time::Duration;

use screenrec_common::error::{ScreenrecError, ScreenrecResult};
use screenrec_platform_core::{
    ArtifactLink, Platform, PreviewSink, RecorderEvent, RecorderEventStream, SharingEnded,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::acquisition::{acquire_streams, AcquiredStreams};
use crate::config::CaptureConfiguration;
use crate::session::{RecordingSession, SessionSnapshot, SessionState};

/// Timing of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Media covered by one recorder chunk.
    pub chunk_interval: Duration,
    /// How often elapsed time is re-published while recording.
    pub ui_refresh: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            chunk_interval: Duration::from_millis(1000),
            ui_refresh: Duration::from_millis(250),
        }
    }
}

impl ControllerConfig {
    pub fn from_defaults(defaults: &screenrec_common::config::RecordingDefaults) -> Self {
        Self {
            chunk_interval: Duration::from_millis(defaults.chunk_interval_ms.max(1)),
            ui_refresh: Duration::from_millis(defaults.ui_refresh_ms.max(1)),
        }
    }
}

enum Command {
    Start {
        config: CaptureConfiguration,
        reply: oneshot::Sender<ScreenrecResult<()>>,
    },
    Pause {
        reply: oneshot::Sender<bool>,
    },
    Resume {
        reply: oneshot::Sender<bool>,
    },
    Stop {
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Spawns the controller task.
pub struct SessionController;

impl SessionController {
    /// Spawn the controller on the current tokio runtime.
    pub fn spawn(
        platform: Platform,
        preview: Box<dyn PreviewSink>,
        config: ControllerConfig,
    ) -> SessionHandle {
        let session = RecordingSession::new(platform.clone(), preview, config.chunk_interval);
        let (command_tx, command_rx) = mpsc::channel(32);
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());

        let mut ticker = tokio::time::interval(config.ui_refresh);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let task = ControllerTask {
            session,
            platform,
            commands: command_rx,
            snapshots: snapshot_tx,
            acquisition: None,
            pending_start: None,
            events: None,
            ended: None,
            ticker,
        };
        tokio::spawn(task.run());

        SessionHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        }
    }
}

/// Cloneable front-end to a running controller.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Start a session. Resolves once the recorder has been started, or
    /// with the error that aborted the attempt. Rejected with
    /// `SessionBusy` while another session is starting or active.
    pub async fn start(&self, config: CaptureConfiguration) -> ScreenrecResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Start { config, reply }).await?;
        rx.await.map_err(|_| ScreenrecError::ControllerClosed)?
    }

    /// Returns whether the pause applied.
    pub async fn pause(&self) -> ScreenrecResult<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Pause { reply }).await?;
        rx.await.map_err(|_| ScreenrecError::ControllerClosed)
    }

    /// Returns whether the resume applied.
    pub async fn resume(&self) -> ScreenrecResult<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Resume { reply }).await?;
        rx.await.map_err(|_| ScreenrecError::ControllerClosed)
    }

    /// Returns whether the stop applied. The artifact follows once the
    /// recorder has flushed; see [`SessionHandle::stop_and_wait`].
    pub async fn stop(&self) -> ScreenrecResult<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stop { reply }).await?;
        rx.await.map_err(|_| ScreenrecError::ControllerClosed)
    }

    /// Stop and wait for the session to return to `Idle`.
    ///
    /// Returns the new download link, if this stop produced one.
    pub async fn stop_and_wait(&self) -> ScreenrecResult<Option<ArtifactLink>> {
        let before = self.snapshot().await?.downloads.len();
        if !self.stop().await? {
            return Ok(None);
        }
        let snapshot = self.wait_for_state(SessionState::Idle).await?;
        if snapshot.downloads.len() > before {
            Ok(snapshot.downloads.first().cloned())
        } else {
            Ok(None)
        }
    }

    /// A fresh snapshot taken by the controller task.
    pub async fn snapshot(&self) -> ScreenrecResult<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|_| ScreenrecError::ControllerClosed)
    }

    /// The most recently published snapshot, without a round trip.
    pub fn latest(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that changes whenever the controller publishes.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a published snapshot is in `state`.
    pub async fn wait_for_state(&self, state: SessionState) -> ScreenrecResult<SessionSnapshot> {
        let mut rx = self.snapshots.clone();
        loop {
            {
                let current = rx.borrow_and_update();
                if current.state == state {
                    return Ok(current.clone());
                }
            }
            rx.changed()
                .await
                .map_err(|_| ScreenrecError::ControllerClosed)?;
        }
    }

    /// Tear everything down and end the controller task.
    pub async fn shutdown(&self) -> ScreenrecResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown { reply }).await?;
        rx.await.map_err(|_| ScreenrecError::ControllerClosed)
    }

    async fn send(&self, command: Command) -> ScreenrecResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ScreenrecError::ControllerClosed)
    }
}

struct ControllerTask {
    session: RecordingSession,
    platform: Platform,
    commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<SessionSnapshot>,
    acquisition: Option<JoinHandle<ScreenrecResult<AcquiredStreams>>>,
    pending_start: Option<oneshot::Sender<ScreenrecResult<()>>>,
    events: Option<RecorderEventStream>,
    ended: Option<SharingEnded>,
    ticker: tokio::time::Interval,
}

impl ControllerTask {
    async fn run(mut self) {
        tracing::debug!("Session controller running");
        loop {
            let recording = matches!(
                self.session.state(),
                SessionState::Recording | SessionState::Paused
            );

            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(Command::Shutdown { reply }) => {
                            self.shutdown().await;
                            let _ = reply.send(());
                            break;
                        }
                        Some(command) => self.handle_command(command),
                        None => {
                            self.shutdown().await;
                            break;
                        }
                    }
                }
                result = join_acquisition(&mut self.acquisition) => {
                    self.acquisition = None;
                    self.complete_start(result);
                }
                event = next_event(&mut self.events) => {
                    match event {
                        Some(event) => self.session.on_recorder_event(event),
                        None => self.events = None,
                    }
                }
                _ = sharing_ended(&mut self.ended) => {
                    self.ended = None;
                    self.session.on_sharing_ended();
                }
                _ = self.ticker.tick(), if recording => {}
            }

            if self.session.state() == SessionState::Idle && self.acquisition.is_none() {
                self.events = None;
                self.ended = None;
            }
            self.publish();
        }
        self.publish();
        tracing::debug!("Session controller stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start { config, reply } => {
                if self.acquisition.is_some() {
                    let _ = reply.send(Err(ScreenrecError::busy(
                        "A capture request is still pending",
                    )));
                    return;
                }
                match self.session.begin_start(config) {
                    Ok(plan) => {
                        let display = self.platform.display.clone();
                        let microphone = self.platform.microphone.clone();
                        self.acquisition = Some(tokio::spawn(async move {
                            acquire_streams(display.as_ref(), microphone.as_ref(), &plan).await
                        }));
                        self.pending_start = Some(reply);
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e));
                    }
                }
            }
            Command::Pause { reply } => {
                let _ = reply.send(self.session.pause());
            }
            Command::Resume { reply } => {
                let _ = reply.send(self.session.resume());
            }
            Command::Stop { reply } => {
                let _ = reply.send(self.session.stop());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.session.snapshot());
            }
            Command::Shutdown { .. } => {}
        }
    }

    fn complete_start(&mut self, result: ScreenrecResult<AcquiredStreams>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel::<RecorderEvent>();
        let outcome = match self.session.finish_start(result, event_tx) {
            Ok(ended) => {
                self.events = Some(event_rx);
                self.ended = Some(ended);
                Ok(())
            }
            Err(e) => Err(e),
        };
        if let Some(reply) = self.pending_start.take() {
            let _ = reply.send(outcome);
        }
    }

    async fn shutdown(&mut self) {
        if let Some(handle) = self.acquisition.take() {
            handle.abort();
            let late = match handle.await {
                Ok(result) => result,
                Err(_) => Err(ScreenrecError::capture("Start was cancelled")),
            };
            // Releases anything granted before the abort landed.
            let (event_tx, _) = mpsc::unbounded_channel();
            self.session.shutdown();
            let _ = self.session.finish_start(late, event_tx);
            if let Some(reply) = self.pending_start.take() {
                let _ = reply.send(Err(ScreenrecError::capture("Start was cancelled")));
            }
        }
        self.session.shutdown();
        self.events = None;
        self.ended = None;
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.session.snapshot());
    }
}

async fn join_acquisition(
    acquisition: &mut Option<JoinHandle<ScreenrecResult<AcquiredStreams>>>,
) -> ScreenrecResult<AcquiredStreams> {
    match acquisition.as_mut() {
        Some(handle) => match handle.await {
            Ok(result) => result,
            Err(e) => Err(ScreenrecError::capture(format!(
                "Capture request task failed: {e}"
            ))),
        },
        None => pending().await,
    }
}

async fn next_event(events: &mut Option<RecorderEventStream>) -> Option<RecorderEvent> {
    match events.as_mut() {
        Some(rx) => rx.recv().await,
        None => pending().await,
    }
}

async fn sharing_ended(ended: &mut Option<SharingEnded>) {
    match ended.as_mut() {
        Some(signal) => signal.recv().await,
        None => pending().await,
    }
}
