use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Opaque handle to an audio resource (remote URL or local file)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioUri(String);

impl AudioUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Build a `file://` URI for a local path
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self(format!("file://{}", path.into().display()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Local path for `file://` URIs
    pub fn to_path(&self) -> Option<PathBuf> {
        self.0.strip_prefix("file://").map(PathBuf::from)
    }
}

impl fmt::Display for AudioUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a microphone permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Audio session routing applied before recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioRouting {
    /// Route the microphone into the session
    pub allows_recording: bool,
    /// Keep playing when the device is in silent mode
    pub plays_in_silent_mode: bool,
}

impl AudioRouting {
    pub fn recording() -> Self {
        Self {
            allows_recording: true,
            plays_in_silent_mode: true,
        }
    }
}

/// Capture parameters handed to the microphone device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingOptions {
    /// Capture rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
        }
    }
}

/// Strongly-typed playback status delivered by a media resource
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Resource is decoded and ready
    Loaded,
    /// Current playback position in seconds
    PositionUpdate(f64),
    /// Playback reached end of media
    Completed,
    /// Playback failed after loading
    Error(String),
}

/// Resources that must be handed back to the platform exactly once
pub trait Release: Send + Sync {
    fn release(&self);
}

/// Platform permissions and audio routing
#[async_trait::async_trait]
pub trait CapabilityProvider: Send + Sync {
    async fn request_microphone_permission(&self) -> Result<PermissionStatus>;

    async fn set_audio_routing(&self, routing: AudioRouting) -> Result<()>;
}

/// Microphone device that hands out capture streams
#[async_trait::async_trait]
pub trait MicrophoneDevice: Send + Sync {
    /// Open the microphone and begin capturing
    async fn open(&self, options: RecordingOptions) -> Result<Arc<dyn MicrophoneStream>>;

    /// Device name for logging
    fn name(&self) -> &str;
}

/// An open microphone capture
#[async_trait::async_trait]
pub trait MicrophoneStream: Release {
    /// Stop capturing and produce a handle to the recorded audio
    async fn finalize(&self) -> Result<AudioUri>;
}

/// Loads audio resources for playback
#[async_trait::async_trait]
pub trait MediaProvider: Send + Sync {
    /// Load `uri`; status events for the resource are sent on `events`
    async fn load(
        &self,
        uri: &AudioUri,
        events: mpsc::Sender<PlaybackEvent>,
    ) -> Result<Arc<dyn MediaResource>>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// A loaded, playable audio resource
#[async_trait::async_trait]
pub trait MediaResource: Release {
    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    /// Stop playback and rewind to the start
    async fn stop(&self) -> Result<()>;
}
