use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, timeout, Instant};
use tracing::{info, warn};
use uuid::Uuid;

use super::snapshot::{RecordingSnapshot, RecordingState};
use crate::audio::{
    AudioRouting, AudioUri, CapabilityProvider, Lease, MicrophoneArbiter, MicrophoneClaim,
    MicrophoneDevice, MicrophoneStream, PermissionStatus, RecordingOptions,
};
use crate::config::{RecordingConfig, WaveformConfig};
use crate::error::{DenialReason, SessionError, SessionResult};
use crate::session::format::format_clock;
use crate::task::TaskHandle;
use crate::util::lock;
use crate::waveform::Waveform;

/// Platform collaborators used by a recording session
#[derive(Clone)]
pub struct RecorderBackend {
    /// Answers permission requests and applies audio routing
    pub capabilities: Arc<dyn CapabilityProvider>,
    /// Device opened on start
    pub microphone: Arc<dyn MicrophoneDevice>,
    /// Shared by every session that records from the same microphone
    pub arbiter: MicrophoneArbiter,
}

/// A finished recording handed off for posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDraft {
    /// Finalized recording
    pub audio_uri: AudioUri,
    /// Whole seconds recorded
    pub duration_seconds: u64,
    /// Trimmed caption, `None` when blank
    pub caption: Option<String>,
}

struct ActiveCapture {
    stream: Lease<dyn MicrophoneStream>,
    claim: MicrophoneClaim,
    started_at: Instant,
    ticker: TaskHandle,
}

struct RecordingInner {
    state: RecordingState,
    /// Frozen elapsed time; live time is read from the capture while recording
    elapsed_seconds: u64,
    result_uri: Option<AudioUri>,
    capture: Option<ActiveCapture>,
    waveform: Waveform,
    in_flight: Option<&'static str>,
    disposed: bool,
}

impl RecordingInner {
    fn elapsed(&self) -> u64 {
        match &self.capture {
            Some(capture) => capture.started_at.elapsed().as_secs(),
            None => self.elapsed_seconds,
        }
    }

    fn snapshot(&self) -> RecordingSnapshot {
        RecordingSnapshot {
            state: self.state,
            elapsed_seconds: self.elapsed(),
            result_uri: self.result_uri.clone(),
        }
    }

    /// Reject operations on disposed or busy sessions and from the wrong state
    fn admit(&self, operation: &'static str, from: RecordingState) -> SessionResult<()> {
        if self.disposed {
            return Err(SessionError::Disposed);
        }
        if self.in_flight.is_some() {
            return Err(SessionError::OperationInFlight(operation));
        }
        if self.state != from {
            return Err(SessionError::InvalidTransition {
                operation,
                state: self.state.as_str(),
            });
        }
        Ok(())
    }
}

struct Shared {
    id: Uuid,
    config: RecordingConfig,
    backend: RecorderBackend,
    inner: Mutex<RecordingInner>,
    snapshots: Arc<watch::Sender<RecordingSnapshot>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RecordingInner> {
        lock(&self.inner)
    }

    fn publish(&self, inner: &RecordingInner) {
        self.snapshots.send_replace(inner.snapshot());
    }
}

/// Marks an operation as in flight until it commits or its future is dropped
struct InFlight<'a> {
    shared: &'a Shared,
    on_cancel: Option<fn(&mut RecordingInner)>,
    committed: bool,
}

impl<'a> InFlight<'a> {
    fn new(shared: &'a Shared, on_cancel: Option<fn(&mut RecordingInner)>) -> Self {
        Self {
            shared,
            on_cancel,
            committed: false,
        }
    }

    fn commit<T>(mut self, apply: impl FnOnce(&mut RecordingInner) -> T) -> T {
        self.committed = true;
        let mut inner = self.shared.lock();
        inner.in_flight = None;
        let out = apply(&mut inner);
        self.shared.publish(&inner);
        out
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut inner = self.shared.lock();
        inner.in_flight = None;
        if let Some(on_cancel) = self.on_cancel {
            on_cancel(&mut inner);
        }
        self.shared.publish(&inner);
    }
}

/// A cancelled or disposed capture has already given the microphone back
fn land_stopped_without_audio(inner: &mut RecordingInner) {
    inner.state = RecordingState::Stopped;
    inner.result_uri = None;
}

fn denied(reason: DenialReason) -> SessionError {
    SessionError::CapabilityDenied(reason)
}

/// Recording lifecycle: Idle → Recording → Stopped → Idle (discard) or Posted.
///
/// Cloning yields another handle to the same session. The microphone is held
/// only while recording and is released exactly once, whichever way the
/// session leaves that state.
#[derive(Clone)]
pub struct RecordingSession {
    shared: Arc<Shared>,
}

impl RecordingSession {
    pub fn new(config: RecordingConfig, waveform: WaveformConfig, backend: RecorderBackend) -> Self {
        let id = Uuid::new_v4();
        info!("Creating recording session {} ({})", id, backend.microphone.name());

        let (snapshots, _) = watch::channel(RecordingSnapshot::default());

        Self {
            shared: Arc::new(Shared {
                id,
                config,
                backend,
                inner: Mutex::new(RecordingInner {
                    state: RecordingState::Idle,
                    elapsed_seconds: 0,
                    result_uri: None,
                    capture: None,
                    waveform: Waveform::new(waveform),
                    in_flight: None,
                    disposed: false,
                }),
                snapshots: Arc::new(snapshots),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Acquire the microphone and begin recording.
    ///
    /// On any failure the session stays Idle and the microphone is not held.
    pub async fn start(&self) -> SessionResult<()> {
        let claim = {
            let mut inner = self.shared.lock();
            inner.admit("start", RecordingState::Idle)?;
            let Some(claim) = self.shared.backend.arbiter.try_claim() else {
                warn!("Recording session {}: microphone is busy", self.shared.id);
                return Err(denied(DenialReason::MicrophoneBusy));
            };
            inner.in_flight = Some("start");
            claim
        };
        let guard = InFlight::new(&self.shared, None);

        info!("Starting recording session {}", self.shared.id);

        let stream = match self.open_microphone().await {
            Ok(stream) => Lease::new("microphone", stream),
            Err(e) => {
                warn!("Recording session {} could not start: {}", self.shared.id, e);
                return Err(e);
            }
        };

        let interval = self.shared.config.tick_interval();
        let snapshots = Arc::clone(&self.shared.snapshots);
        let id = self.shared.id;

        guard.commit(move |inner| {
            if inner.disposed {
                info!("Recording session {} disposed while starting, releasing microphone", id);
                return Err(SessionError::Disposed);
            }

            let started_at = Instant::now();
            inner.capture = Some(ActiveCapture {
                stream,
                claim,
                started_at,
                ticker: TaskHandle::spawn(
                    "recording-ticker",
                    tick_elapsed(snapshots, started_at, interval),
                ),
            });
            inner.state = RecordingState::Recording;
            inner.elapsed_seconds = 0;
            inner.result_uri = None;
            inner.waveform.set_recording(true);

            info!("Recording session {} is recording", id);
            Ok(())
        })
    }

    async fn open_microphone(&self) -> SessionResult<Arc<dyn MicrophoneStream>> {
        let config = &self.shared.config;
        let backend = &self.shared.backend;

        let status = timeout(
            config.permission_timeout(),
            backend.capabilities.request_microphone_permission(),
        )
        .await
        .map_err(|_| denied(DenialReason::TimedOut("permission request")))?
        .map_err(|e| denied(DenialReason::DeviceUnavailable(format!("{:#}", e))))?;

        if status == PermissionStatus::Denied {
            return Err(denied(DenialReason::PermissionRefused));
        }

        backend
            .capabilities
            .set_audio_routing(AudioRouting::recording())
            .await
            .map_err(|e| denied(DenialReason::RoutingRejected(format!("{:#}", e))))?;

        let options = RecordingOptions {
            sample_rate: config.sample_rate,
            channels: config.channels,
        };

        timeout(config.open_timeout(), backend.microphone.open(options))
            .await
            .map_err(|_| denied(DenialReason::TimedOut("microphone open")))?
            .map_err(|e| denied(DenialReason::DeviceUnavailable(format!("{:#}", e))))
    }

    /// Finalize the capture and release the microphone.
    ///
    /// The session lands in Stopped either way; on `FinalizeFailed` it holds
    /// no result URI.
    pub async fn stop(&self) -> SessionResult<AudioUri> {
        let capture = {
            let mut inner = self.shared.lock();
            inner.admit("stop", RecordingState::Recording)?;
            let Some(capture) = inner.capture.take() else {
                return Err(SessionError::InvalidTransition {
                    operation: "stop",
                    state: "recording without a capture",
                });
            };
            inner.elapsed_seconds = capture.started_at.elapsed().as_secs();
            inner.in_flight = Some("stop");
            inner.waveform.set_recording(false);
            self.shared.publish(&inner);
            capture
        };
        let guard = InFlight::new(&self.shared, Some(land_stopped_without_audio));

        let ActiveCapture {
            stream,
            claim,
            mut ticker,
            ..
        } = capture;
        ticker.cancel();

        info!("Stopping recording session {}", self.shared.id);

        let finalized = timeout(
            self.shared.config.finalize_timeout(),
            stream.handle().finalize(),
        )
        .await;
        stream.release();
        drop(claim);

        let outcome = match finalized {
            Ok(Ok(uri)) => Ok(uri),
            Ok(Err(e)) => Err(SessionError::FinalizeFailed(format!("{:#}", e))),
            Err(_) => Err(SessionError::FinalizeFailed("finalize timed out".to_string())),
        };

        let id = self.shared.id;
        guard.commit(move |inner| {
            if inner.disposed {
                info!("Recording session {} disposed while stopping, discarding result", id);
                land_stopped_without_audio(inner);
                return Err(SessionError::Disposed);
            }

            inner.state = RecordingState::Stopped;
            match outcome {
                Ok(uri) => {
                    info!("Recording session {} stopped: {}", id, uri);
                    inner.result_uri = Some(uri.clone());
                    Ok(uri)
                }
                Err(e) => {
                    warn!("Recording session {} stopped without audio: {}", id, e);
                    inner.result_uri = None;
                    Err(e)
                }
            }
        })
    }

    /// Throw away the stopped recording and return to Idle
    pub fn discard(&self) -> SessionResult<()> {
        let mut inner = self.shared.lock();
        inner.admit("discard", RecordingState::Stopped)?;

        inner.result_uri = None;
        inner.elapsed_seconds = 0;
        inner.state = RecordingState::Idle;
        self.shared.publish(&inner);

        info!("Recording session {} discarded", self.shared.id);
        Ok(())
    }

    /// Hand the stopped recording off as a post draft (terminal)
    pub fn post(&self, caption: Option<&str>) -> SessionResult<PostDraft> {
        let mut inner = self.shared.lock();
        inner.admit("post", RecordingState::Stopped)?;

        let caption = caption
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        let max = self.shared.config.max_caption_chars;
        if caption.as_ref().map_or(false, |c| c.chars().count() > max) {
            return Err(SessionError::CaptionTooLong { max });
        }

        let Some(audio_uri) = inner.result_uri.take() else {
            return Err(SessionError::NothingRecorded);
        };
        inner.state = RecordingState::Posted;
        self.shared.publish(&inner);

        info!("Recording session {} posted {}", self.shared.id, audio_uri);

        Ok(PostDraft {
            audio_uri,
            duration_seconds: inner.elapsed_seconds,
            caption,
        })
    }

    /// Tear the session down. Idempotent.
    ///
    /// A held microphone is released immediately and a live recording lands
    /// in Stopped without audio, its elapsed time frozen. An operation still
    /// in flight releases whatever it acquires once it resolves.
    pub fn dispose(&self) {
        let capture = {
            let mut inner = self.shared.lock();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            inner.waveform.dispose();
            let capture = inner.capture.take();
            if let Some(capture) = &capture {
                inner.elapsed_seconds = capture.started_at.elapsed().as_secs();
                land_stopped_without_audio(&mut inner);
            }
            self.shared.publish(&inner);
            capture
        };

        if let Some(capture) = capture {
            drop(capture);
            info!(
                "Recording session {} disposed, microphone released",
                self.shared.id
            );
        } else {
            info!("Recording session {} disposed", self.shared.id);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lock().disposed
    }

    pub fn state(&self) -> RecordingState {
        self.shared.lock().state
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.shared.lock().elapsed()
    }

    /// Elapsed time as `m:ss`
    pub fn time_elapsed(&self) -> String {
        format_clock(self.elapsed_seconds())
    }

    pub fn result_uri(&self) -> Option<AudioUri> {
        self.shared.lock().result_uri.clone()
    }

    pub fn snapshot(&self) -> RecordingSnapshot {
        self.shared.lock().snapshot()
    }

    /// Receive a snapshot after every transition and once per tick while recording
    pub fn subscribe(&self) -> watch::Receiver<RecordingSnapshot> {
        self.shared.snapshots.subscribe()
    }

    pub fn waveform_levels(&self) -> Vec<f32> {
        self.shared.lock().waveform.levels()
    }

    pub fn is_waveform_animating(&self) -> bool {
        self.shared.lock().waveform.is_animating()
    }
}

async fn tick_elapsed(
    snapshots: Arc<watch::Sender<RecordingSnapshot>>,
    started_at: Instant,
    interval: Duration,
) {
    let mut ticker = time::interval_at(started_at + interval, interval);
    loop {
        ticker.tick().await;
        let elapsed = started_at.elapsed().as_secs();
        snapshots.send_modify(|snapshot| snapshot.elapsed_seconds = elapsed);
    }
}
