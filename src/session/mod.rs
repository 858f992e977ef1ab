//! Audio session state machines
//!
//! This module provides the two session types a host UI drives:
//! - `RecordingSession`: microphone capture (start → stop → discard/post)
//! - `PlaybackSession`: lazily loaded playback of one post's audio
//!
//! Both are cheap `Clone` handles; each owns its platform resource through a
//! lease that is released exactly once.

mod format;
mod playback;
mod recording;
mod snapshot;

pub use format::{format_clock, format_clock_f64};
pub use playback::PlaybackSession;
pub use recording::{PostDraft, RecorderBackend, RecordingSession};
pub use snapshot::{PlaybackSnapshot, PlaybackState, RecordingSnapshot, RecordingState};
