use std::fmt;

/// Errors reported at the session boundary.
///
/// Every variant is recoverable: the session that returned it is left in a
/// documented state and the caller decides whether to retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Microphone access was refused, is held elsewhere, or could not be set up
    #[error("microphone capability denied: {0}")]
    CapabilityDenied(DenialReason),

    /// The playback resource could not be loaded or decoded
    #[error("failed to load audio resource {uri}: {reason}")]
    ResourceLoadFailed { uri: String, reason: String },

    /// A loaded resource refused to play, pause or stop
    #[error("playback failed: {0}")]
    PlaybackFailed(String),

    /// The recording could not be finalized to a usable handle
    #[error("failed to finalize recording: {0}")]
    FinalizeFailed(String),

    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: &'static str,
    },

    #[error("{0} rejected: another operation is still in flight")]
    OperationInFlight(&'static str),

    #[error("session has been disposed")]
    Disposed,

    #[error("nothing was recorded")]
    NothingRecorded,

    #[error("caption exceeds {max} characters")]
    CaptionTooLong { max: usize },
}

/// Why a recording could not start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    PermissionRefused,
    /// Another session currently holds the microphone
    MicrophoneBusy,
    RoutingRejected(String),
    DeviceUnavailable(String),
    TimedOut(&'static str),
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::PermissionRefused => write!(f, "permission refused"),
            DenialReason::MicrophoneBusy => write!(f, "microphone is busy"),
            DenialReason::RoutingRejected(reason) => {
                write!(f, "audio routing rejected: {}", reason)
            }
            DenialReason::DeviceUnavailable(reason) => {
                write!(f, "microphone unavailable: {}", reason)
            }
            DenialReason::TimedOut(step) => write!(f, "{} timed out", step),
        }
    }
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
