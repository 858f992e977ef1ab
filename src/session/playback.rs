use futures::stream::{self, Stream};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::snapshot::{PlaybackSnapshot, PlaybackState};
use crate::audio::{AudioUri, Lease, MediaProvider, MediaResource, PlaybackEvent};
use crate::config::PlaybackConfig;
use crate::error::{SessionError, SessionResult};
use crate::task::TaskHandle;
use crate::util::lock;

struct LoadedMedia {
    resource: Lease<dyn MediaResource>,
    /// Applies the resource's events to session state
    pump: TaskHandle,
}

struct PlaybackInner {
    loaded: Option<LoadedMedia>,
    is_playing: bool,
    position_seconds: f64,
    last_error: Option<String>,
    in_flight: Option<&'static str>,
    disposed: bool,
}

impl PlaybackInner {
    fn admit(&self, operation: &'static str) -> SessionResult<()> {
        if self.disposed {
            return Err(SessionError::Disposed);
        }
        if self.in_flight.is_some() {
            return Err(SessionError::OperationInFlight(operation));
        }
        Ok(())
    }
}

struct Shared {
    uri: AudioUri,
    duration_seconds: f64,
    config: PlaybackConfig,
    provider: Arc<dyn MediaProvider>,
    inner: Mutex<PlaybackInner>,
    snapshots: watch::Sender<PlaybackSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PlaybackInner> {
        lock(&self.inner)
    }

    fn snapshot(&self, inner: &PlaybackInner) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: if inner.loaded.is_some() {
                PlaybackState::Loaded
            } else {
                PlaybackState::Unloaded
            },
            is_playing: inner.loaded.is_some() && inner.is_playing,
            position_seconds: inner.position_seconds,
            duration_seconds: self.duration_seconds,
            last_error: inner.last_error.clone(),
        }
    }

    fn publish(&self, inner: &PlaybackInner) {
        self.snapshots.send_replace(self.snapshot(inner));
    }

    fn apply_event(&self, event: PlaybackEvent) {
        let mut inner = self.lock();
        if inner.disposed || inner.loaded.is_none() {
            return;
        }

        match event {
            PlaybackEvent::Loaded => {
                debug!("{} reported loaded", self.uri);
                return;
            }
            PlaybackEvent::PositionUpdate(seconds) => {
                if seconds.is_nan() {
                    return;
                }
                inner.position_seconds = seconds.clamp(0.0, self.duration_seconds);
            }
            PlaybackEvent::Completed => {
                // Both fields change under one lock so no observer sees a stale position
                inner.is_playing = false;
                inner.position_seconds = 0.0;
                info!("Playback of {} completed", self.uri);
            }
            PlaybackEvent::Error(message) => {
                warn!("Playback of {} failed: {}", self.uri, message);
                inner.is_playing = false;
                inner.last_error = Some(message);
            }
        }

        self.publish(&inner);
    }
}

/// Marks an operation as in flight until it commits or its future is dropped
struct InFlight<'a> {
    shared: &'a Shared,
    committed: bool,
}

impl<'a> InFlight<'a> {
    fn new(shared: &'a Shared) -> Self {
        Self {
            shared,
            committed: false,
        }
    }

    fn commit(
        mut self,
        apply: impl FnOnce(&mut PlaybackInner) -> SessionResult<()>,
    ) -> SessionResult<PlaybackSnapshot> {
        self.committed = true;
        let mut inner = self.shared.lock();
        inner.in_flight = None;
        let outcome = apply(&mut inner);
        self.shared.publish(&inner);
        outcome.map(|()| self.shared.snapshot(&inner))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.shared.lock().in_flight = None;
        }
    }
}

enum Toggle {
    Load,
    Pause(Arc<dyn MediaResource>),
    Resume(Arc<dyn MediaResource>),
}

/// Playback of one post's audio.
///
/// The resource is loaded on the first play request and released exactly
/// once when the session is disposed (or its last handle dropped).
#[derive(Clone)]
pub struct PlaybackSession {
    shared: Arc<Shared>,
}

impl PlaybackSession {
    /// `duration_seconds` comes from post metadata, not from the audio itself
    pub fn new(
        uri: AudioUri,
        duration_seconds: f64,
        provider: Arc<dyn MediaProvider>,
        config: PlaybackConfig,
    ) -> Self {
        let duration_seconds = if duration_seconds.is_finite() && duration_seconds > 0.0 {
            duration_seconds
        } else {
            0.0
        };
        let (snapshots, _) = watch::channel(PlaybackSnapshot::new(duration_seconds));

        Self {
            shared: Arc::new(Shared {
                uri,
                duration_seconds,
                config,
                provider,
                inner: Mutex::new(PlaybackInner {
                    loaded: None,
                    is_playing: false,
                    position_seconds: 0.0,
                    last_error: None,
                    in_flight: None,
                    disposed: false,
                }),
                snapshots,
            }),
        }
    }

    pub fn uri(&self) -> &AudioUri {
        &self.shared.uri
    }

    /// Load and play, pause, or resume depending on the current state
    pub async fn toggle_play_pause(&self) -> SessionResult<PlaybackSnapshot> {
        const OPERATION: &str = "toggle play/pause";

        let action = {
            let mut inner = self.shared.lock();
            inner.admit(OPERATION)?;
            let action = match &inner.loaded {
                None => Toggle::Load,
                Some(media) if inner.is_playing => Toggle::Pause(media.resource.handle()),
                Some(media) => Toggle::Resume(media.resource.handle()),
            };
            inner.in_flight = Some(OPERATION);
            action
        };
        let guard = InFlight::new(&self.shared);

        match action {
            Toggle::Load => self.load_and_play(guard).await,
            Toggle::Pause(resource) => {
                let result = resource.pause().await;
                guard.commit(|inner| {
                    if inner.disposed {
                        return Err(SessionError::Disposed);
                    }
                    result.map_err(|e| SessionError::PlaybackFailed(format!("{:#}", e)))?;
                    inner.is_playing = false;
                    Ok(())
                })
            }
            Toggle::Resume(resource) => {
                let result = resource.play().await;
                guard.commit(|inner| {
                    if inner.disposed {
                        return Err(SessionError::Disposed);
                    }
                    result.map_err(|e| SessionError::PlaybackFailed(format!("{:#}", e)))?;
                    inner.is_playing = true;
                    inner.last_error = None;
                    Ok(())
                })
            }
        }
    }

    async fn load_and_play(&self, guard: InFlight<'_>) -> SessionResult<PlaybackSnapshot> {
        let uri = &self.shared.uri;
        let load_failed = |reason: String| SessionError::ResourceLoadFailed {
            uri: uri.to_string(),
            reason,
        };

        info!("Loading {} via {}", uri, self.shared.provider.name());

        let (events_tx, events_rx) = mpsc::channel(self.shared.config.event_buffer.max(1));
        let resource = match timeout(
            self.shared.config.load_timeout(),
            self.shared.provider.load(uri, events_tx),
        )
        .await
        {
            Ok(Ok(resource)) => Lease::new("media", resource),
            Ok(Err(e)) => {
                warn!("Failed to load {}: {:#}", uri, e);
                return Err(load_failed(format!("{:#}", e)));
            }
            Err(_) => {
                warn!("Timed out loading {}", uri);
                return Err(load_failed("load timed out".to_string()));
            }
        };

        if let Err(e) = resource.handle().play().await {
            warn!("{} loaded but would not play: {:#}", uri, e);
            return Err(load_failed(format!("{:#}", e)));
        }

        let weak = Arc::downgrade(&self.shared);
        guard.commit(move |inner| {
            if inner.disposed {
                info!("Playback session disposed while loading, releasing resource");
                return Err(SessionError::Disposed);
            }

            inner.loaded = Some(LoadedMedia {
                resource,
                pump: TaskHandle::spawn("playback-events", pump_events(weak, events_rx)),
            });
            inner.is_playing = true;
            inner.position_seconds = 0.0;
            inner.last_error = None;
            Ok(())
        })
    }

    /// Stop playback and rewind without releasing the resource
    pub async fn stop(&self) -> SessionResult<PlaybackSnapshot> {
        let resource = {
            let mut inner = self.shared.lock();
            inner.admit("stop")?;
            let Some(media) = &inner.loaded else {
                return Err(SessionError::InvalidTransition {
                    operation: "stop",
                    state: PlaybackState::Unloaded.as_str(),
                });
            };
            let resource = media.resource.handle();
            inner.in_flight = Some("stop");
            resource
        };
        let guard = InFlight::new(&self.shared);

        let result = resource.stop().await;
        guard.commit(|inner| {
            if inner.disposed {
                return Err(SessionError::Disposed);
            }
            result.map_err(|e| SessionError::PlaybackFailed(format!("{:#}", e)))?;
            inner.is_playing = false;
            inner.position_seconds = 0.0;
            Ok(())
        })
    }

    /// Tear the session down. Idempotent; does nothing to the platform when unloaded.
    pub fn dispose(&self) {
        let media = {
            let mut inner = self.shared.lock();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            inner.is_playing = false;
            let media = inner.loaded.take();
            self.shared.publish(&inner);
            media
        };

        if let Some(media) = media {
            let LoadedMedia { resource, mut pump } = media;
            pump.cancel();
            resource.release();
            info!("Playback session for {} disposed, resource released", self.shared.uri);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lock().disposed
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let inner = self.shared.lock();
        self.shared.snapshot(&inner)
    }

    pub fn state(&self) -> PlaybackState {
        self.snapshot().state
    }

    pub fn is_playing(&self) -> bool {
        self.snapshot().is_playing
    }

    pub fn position_seconds(&self) -> f64 {
        self.snapshot().position_seconds
    }

    pub fn duration_seconds(&self) -> f64 {
        self.shared.duration_seconds
    }

    pub fn progress(&self) -> f64 {
        self.snapshot().progress()
    }

    /// `position / duration` as `m:ss / m:ss`
    pub fn time_label(&self) -> String {
        self.snapshot().time_label()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Stream of snapshots, one per change, ending when the session is dropped
    pub fn updates(&self) -> impl Stream<Item = PlaybackSnapshot> {
        stream::unfold(self.subscribe(), |mut rx| async move {
            rx.changed().await.ok()?;
            let snapshot = rx.borrow_and_update().clone();
            Some((snapshot, rx))
        })
    }
}

async fn pump_events(shared: Weak<Shared>, mut events: mpsc::Receiver<PlaybackEvent>) {
    while let Some(event) = events.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.apply_event(event);
    }
}
