//! Chunking recorder driven by tokio time or by hand.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use screenrec_common::error::{ScreenrecError, ScreenrecResult};
use screenrec_platform_core::{
    MediaRecorder, MediaStream, RecorderBackend, RecorderEvent, RecorderEventSink,
    RecorderOptions, RecorderState,
};
use tokio::task::JoinHandle;

use crate::{ChunkPlan, Shared};

pub struct SyntheticRecorderBackend {
    shared: Arc<Shared>,
}

impl SyntheticRecorderBackend {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

impl RecorderBackend for SyntheticRecorderBackend {
    fn is_available(&self) -> bool {
        self.shared.options.recorder_available
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.is_available()
            && self
                .shared
                .options
                .supported_types
                .iter()
                .any(|t| t == mime_type)
    }

    fn create(
        &self,
        stream: &MediaStream,
        options: &RecorderOptions,
        events: RecorderEventSink,
    ) -> ScreenrecResult<Box<dyn MediaRecorder>> {
        let settings = &self.shared.options;
        if !settings.recorder_available {
            return Err(ScreenrecError::recorder("MediaRecorder is not available"));
        }
        if settings.fail_recorder_construction {
            return Err(ScreenrecError::recorder(
                "The encoder could not be initialised",
            ));
        }
        if stream.first_video().is_none() {
            return Err(ScreenrecError::recorder("Stream has no video track"));
        }
        if let Some(mime) = options.mime_type.as_deref() {
            if !self.is_type_supported(mime) {
                return Err(ScreenrecError::recorder(format!("{mime} is not supported")));
            }
        }

        let mime_type = options
            .mime_type
            .clone()
            .unwrap_or_else(|| settings.default_mime.clone());
        let handle = RecorderHandle {
            inner: Arc::new(RecorderInner {
                events,
                options: options.clone(),
                mime_type,
                state: Mutex::new(RecorderState::Inactive),
                timeslice: Mutex::new(None),
                final_chunk: Mutex::new(Vec::new()),
                sequence: AtomicU8::new(0),
            }),
        };
        self.shared.register_recorder(handle.clone());

        tracing::debug!(
            mime = %handle.mime_type(),
            bits_per_second = options.video_bits_per_second,
            tracks = stream.len(),
            "Synthetic recorder created"
        );

        Ok(Box::new(SyntheticRecorder {
            handle,
            plan: settings.chunks,
            fail_stop: settings.fail_recorder_stop,
            generator: None,
        }))
    }
}

struct RecorderInner {
    events: RecorderEventSink,
    options: RecorderOptions,
    mime_type: String,
    state: Mutex<RecorderState>,
    timeslice: Mutex<Option<Duration>>,
    final_chunk: Mutex<Vec<u8>>,
    sequence: AtomicU8,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Test-side view of a created recorder.
#[derive(Clone)]
pub struct RecorderHandle {
    inner: Arc<RecorderInner>,
}

impl RecorderHandle {
    /// Deliver a data chunk as if the encoder produced it.
    pub fn emit(&self, chunk: Vec<u8>) -> bool {
        self.send(RecorderEvent::Data(chunk))
    }

    /// The chunk flushed when the recorder is stopped. Empty by default.
    pub fn set_final_chunk(&self, chunk: Vec<u8>) {
        *lock(&self.inner.final_chunk) = chunk;
    }

    /// Report an encoder failure.
    pub fn fail(&self, message: impl Into<String>) -> bool {
        self.send(RecorderEvent::Error(message.into()))
    }

    pub fn state(&self) -> RecorderState {
        *lock(&self.inner.state)
    }

    pub fn options(&self) -> &RecorderOptions {
        &self.inner.options
    }

    pub fn mime_type(&self) -> &str {
        &self.inner.mime_type
    }

    /// The timeslice passed to `start`, once started.
    pub fn timeslice(&self) -> Option<Duration> {
        *lock(&self.inner.timeslice)
    }

    fn set_state(&self, state: RecorderState) {
        *lock(&self.inner.state) = state;
    }

    fn send(&self, event: RecorderEvent) -> bool {
        self.inner.events.send(event).is_ok()
    }

    fn emit_generated(&self, size: usize) -> bool {
        let fill = self.inner.sequence.fetch_add(1, Ordering::Relaxed);
        self.emit(vec![fill; size])
    }
}

struct SyntheticRecorder {
    handle: RecorderHandle,
    plan: ChunkPlan,
    fail_stop: bool,
    generator: Option<JoinHandle<()>>,
}

impl SyntheticRecorder {
    fn chunk_size(&self, timeslice: Duration) -> Option<usize> {
        match self.plan {
            ChunkPlan::Manual => None,
            ChunkPlan::Fixed(size) => Some(size),
            ChunkPlan::Bitrate => {
                let bits = u128::from(self.handle.options().video_bits_per_second)
                    * timeslice.as_millis()
                    / 1000;
                Some((bits / 8) as usize)
            }
        }
    }

    fn spawn_generator(&mut self, timeslice: Duration) {
        let Some(size) = self.chunk_size(timeslice) else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime; synthetic recorder will not generate chunks");
            return;
        };

        let handle = self.handle.clone();
        self.generator = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(timeslice);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match handle.state() {
                    RecorderState::Recording => {
                        if !handle.emit_generated(size) {
                            break;
                        }
                    }
                    RecorderState::Paused => {}
                    RecorderState::Inactive => break,
                }
            }
        }));
    }

    fn stop_generator(&mut self) {
        if let Some(generator) = self.generator.take() {
            generator.abort();
        }
    }
}

impl MediaRecorder for SyntheticRecorder {
    fn start(&mut self, timeslice: Duration) -> ScreenrecResult<()> {
        if self.handle.state() != RecorderState::Inactive {
            return Err(ScreenrecError::capture("Recorder already started"));
        }
        *lock(&self.handle.inner.timeslice) = Some(timeslice);
        self.handle.set_state(RecorderState::Recording);
        self.handle.send(RecorderEvent::Started);
        self.spawn_generator(timeslice);
        Ok(())
    }

    fn pause(&mut self) -> ScreenrecResult<()> {
        if self.handle.state() != RecorderState::Recording {
            return Err(ScreenrecError::capture("Recorder is not recording"));
        }
        self.handle.set_state(RecorderState::Paused);
        self.handle.send(RecorderEvent::Paused);
        Ok(())
    }

    fn resume(&mut self) -> ScreenrecResult<()> {
        if self.handle.state() != RecorderState::Paused {
            return Err(ScreenrecError::capture("Recorder is not paused"));
        }
        self.handle.set_state(RecorderState::Recording);
        self.handle.send(RecorderEvent::Resumed);
        Ok(())
    }

    fn stop(&mut self) -> ScreenrecResult<()> {
        if self.fail_stop {
            return Err(ScreenrecError::capture("Recorder failed to flush"));
        }
        if self.handle.state() == RecorderState::Inactive {
            return Err(ScreenrecError::capture("Recorder is not running"));
        }
        self.stop_generator();
        self.handle.set_state(RecorderState::Inactive);

        let last = std::mem::take(&mut *lock(&self.handle.inner.final_chunk));
        self.handle.send(RecorderEvent::Data(last));
        self.handle.send(RecorderEvent::Stopped);
        Ok(())
    }

    fn state(&self) -> RecorderState {
        self.handle.state()
    }

    fn mime_type(&self) -> String {
        self.handle.mime_type().to_string()
    }
}

impl Drop for SyntheticRecorder {
    fn drop(&mut self) {
        self.stop_generator();
    }
}
