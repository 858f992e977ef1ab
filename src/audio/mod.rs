pub mod arbiter;
pub mod backend;
pub mod clocked;
pub mod counters;
pub mod file;
pub mod lease;
pub mod simulated;

pub use arbiter::{MicrophoneArbiter, MicrophoneClaim};
pub use backend::{
    AudioRouting, AudioUri, CapabilityProvider, MediaProvider, MediaResource, MicrophoneDevice,
    MicrophoneStream, PermissionStatus, PlaybackEvent, RecordingOptions, Release,
};
pub use clocked::ClockedResource;
pub use counters::{CounterSnapshot, ResourceCounters};
pub use file::{AudioFile, FileMediaProvider};
pub use lease::Lease;
pub use simulated::{SimulatedCapabilities, SimulatedMediaProvider, SimulatedMicrophone};
