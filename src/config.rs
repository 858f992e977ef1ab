use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Microphone capture and session timeouts
    pub recording: RecordingConfig,
    /// Playback loading and position reporting
    pub playback: PlaybackConfig,
    /// Recording visualizer animation
    pub waveform: WaveformConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Where the simulated microphone writes finalized recordings
    pub recordings_path: String,
    /// Capture rate in Hz
    pub sample_rate: u32,
    /// Number of capture channels
    pub channels: u16,
    /// Interval of the elapsed-time ticker
    pub tick_interval_ms: u64,
    /// Limit on the microphone permission request
    pub permission_timeout_ms: u64,
    /// Limit on opening the microphone
    pub open_timeout_ms: u64,
    /// Limit on finalizing a capture
    pub finalize_timeout_ms: u64,
    /// Longest caption accepted when posting
    pub max_caption_chars: usize,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            recordings_path: "~/.local/share/audio-first/recordings".to_string(),
            sample_rate: 44100,
            channels: 1,
            tick_interval_ms: 1000,
            permission_timeout_ms: 30_000,
            open_timeout_ms: 10_000,
            finalize_timeout_ms: 10_000,
            max_caption_chars: 280,
        }
    }
}

impl RecordingConfig {
    pub fn recordings_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.recordings_path).into_owned())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn permission_timeout(&self) -> Duration {
        Duration::from_millis(self.permission_timeout_ms)
    }

    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    pub fn finalize_timeout(&self) -> Duration {
        Duration::from_millis(self.finalize_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Limit on loading a resource
    pub load_timeout_ms: u64,
    /// How often clocked resources report their position
    pub position_interval_ms: u64,
    /// Capacity of the per-resource event channel
    pub event_buffer: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: 15_000,
            position_interval_ms: 250,
            event_buffer: 64,
        }
    }
}

impl PlaybackConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn position_interval(&self) -> Duration {
        Duration::from_millis(self.position_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WaveformConfig {
    /// Number of bars drawn
    pub bar_count: usize,
    /// Resting bar height as a fraction of the maximum
    pub floor: f32,
    /// Shortest animation segment
    pub min_segment_ms: u64,
    /// Longest animation segment
    pub max_segment_ms: u64,
    /// Start delay added per bar index
    pub stagger_ms: u64,
    /// Length of the settle pass after recording stops
    pub settle_ms: u64,
    /// Animation frame interval
    pub frame_ms: u64,
    /// Fixed RNG seed; random when unset
    pub seed: Option<u64>,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            bar_count: 40,
            floor: 0.2,
            min_segment_ms: 150,
            max_segment_ms: 250,
            stagger_ms: 20,
            settle_ms: 200,
            frame_ms: 16,
            seed: None,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("AUDIO_FIRST").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
