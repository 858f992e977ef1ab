pub mod audio;
pub mod config;
pub mod error;
pub mod feed;
pub mod session;
pub mod task;
pub mod waveform;

mod util;

pub use audio::{
    AudioFile, AudioRouting, AudioUri, CapabilityProvider, FileMediaProvider, MediaProvider,
    MediaResource, MicrophoneArbiter, MicrophoneDevice, MicrophoneStream, PermissionStatus,
    PlaybackEvent, RecordingOptions, SimulatedCapabilities, SimulatedMediaProvider,
    SimulatedMicrophone,
};
pub use config::Config;
pub use error::{DenialReason, SessionError, SessionResult};
pub use feed::{AudioComment, AudioPost, FeedPlayers, Profile, User};
pub use session::{
    format_clock, PlaybackSession, PlaybackSnapshot, PlaybackState, PostDraft, RecorderBackend,
    RecordingSession, RecordingSnapshot, RecordingState,
};
pub use waveform::Waveform;
