use serde::{Deserialize, Serialize};

use super::format::{format_clock, format_clock_f64};
use crate::audio::AudioUri;

/// Lifecycle phase of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordingState {
    /// Not recording, ready to start
    Idle,
    /// Microphone held, elapsed time counting
    Recording,
    /// Capture finished; a result URI is present unless finalizing failed
    Stopped,
    /// Recording handed off as a post draft (terminal)
    Posted,
}

impl RecordingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingState::Idle => "idle",
            RecordingState::Recording => "recording",
            RecordingState::Stopped => "stopped",
            RecordingState::Posted => "posted",
        }
    }
}

/// Observable state of a recording session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSnapshot {
    /// Current lifecycle phase
    pub state: RecordingState,

    /// Whole seconds recorded so far (frozen once stopped)
    pub elapsed_seconds: u64,

    /// Handle to the finalized recording
    pub result_uri: Option<AudioUri>,
}

impl RecordingSnapshot {
    pub fn time_elapsed(&self) -> String {
        format_clock(self.elapsed_seconds)
    }
}

impl Default for RecordingSnapshot {
    fn default() -> Self {
        Self {
            state: RecordingState::Idle,
            elapsed_seconds: 0,
            result_uri: None,
        }
    }
}

/// Whether a playback session holds a decoded resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Unloaded,
    Loaded,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Unloaded => "unloaded",
            PlaybackState::Loaded => "loaded",
        }
    }
}

/// Observable state of a playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    /// Whether a resource is held
    pub state: PlaybackState,

    /// Only meaningful while loaded
    pub is_playing: bool,

    /// Current position, 0 ≤ position ≤ duration
    pub position_seconds: f64,

    /// Duration from post metadata
    pub duration_seconds: f64,

    /// Last error reported by the resource after loading
    pub last_error: Option<String>,
}

impl PlaybackSnapshot {
    pub fn new(duration_seconds: f64) -> Self {
        Self {
            state: PlaybackState::Unloaded,
            is_playing: false,
            position_seconds: 0.0,
            duration_seconds,
            last_error: None,
        }
    }

    /// Position rounded down to whole seconds
    pub fn display_position(&self) -> u64 {
        if self.position_seconds.is_finite() && self.position_seconds > 0.0 {
            self.position_seconds.floor() as u64
        } else {
            0
        }
    }

    /// Fraction of the track played, clamped to [0, 1]; 0 for empty tracks
    pub fn progress(&self) -> f64 {
        if !(self.duration_seconds.is_finite() && self.duration_seconds > 0.0) {
            return 0.0;
        }
        let fraction = self.position_seconds / self.duration_seconds;
        if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        }
    }

    /// `position / duration`, e.g. `0:05 / 0:45`
    pub fn time_label(&self) -> String {
        format!(
            "{} / {}",
            format_clock(self.display_position()),
            format_clock_f64(self.duration_seconds)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(position_seconds: f64, duration_seconds: f64) -> PlaybackSnapshot {
        PlaybackSnapshot {
            position_seconds,
            ..PlaybackSnapshot::new(duration_seconds)
        }
    }

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(at(0.0, 45.0).progress(), 0.0);
        assert!((at(22.5, 45.0).progress() - 0.5).abs() < f64::EPSILON);
        assert_eq!(at(90.0, 45.0).progress(), 1.0);
        assert_eq!(at(-3.0, 45.0).progress(), 0.0);
    }

    #[test]
    fn test_progress_is_zero_without_duration() {
        for position in [0.0, 1.0, 30.0, f64::INFINITY] {
            assert_eq!(at(position, 0.0).progress(), 0.0);
        }
    }

    #[test]
    fn test_time_label() {
        assert_eq!(at(5.7, 45.0).time_label(), "0:05 / 0:45");
        assert_eq!(at(65.0, 120.0).time_label(), "1:05 / 2:00");
    }
}
