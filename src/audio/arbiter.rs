use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Exclusive access gate for a single microphone.
///
/// Every recording session targeting the same device shares one arbiter;
/// claiming never waits.
#[derive(Debug, Clone)]
pub struct MicrophoneArbiter {
    permits: Arc<Semaphore>,
}

/// Proof of exclusive microphone ownership, returned to the arbiter on drop
#[derive(Debug)]
pub struct MicrophoneClaim {
    _permit: OwnedSemaphorePermit,
}

impl MicrophoneArbiter {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// Claim the microphone, or `None` if another session holds it
    pub fn try_claim(&self) -> Option<MicrophoneClaim> {
        Arc::clone(&self.permits)
            .try_acquire_owned()
            .ok()
            .map(|permit| MicrophoneClaim { _permit: permit })
    }

    pub fn is_held(&self) -> bool {
        self.permits.available_permits() == 0
    }
}

impl Default for MicrophoneArbiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_fails_until_first_is_dropped() {
        let arbiter = MicrophoneArbiter::new();
        let shared = arbiter.clone();

        let claim = arbiter.try_claim().expect("first claim");
        assert!(shared.is_held());
        assert!(shared.try_claim().is_none());

        drop(claim);
        assert!(!arbiter.is_held());
        assert!(shared.try_claim().is_some());
    }
}
