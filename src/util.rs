use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a state mutex, recovering the data if a previous holder panicked.
///
/// Session state is only ever mutated in short, non-panicking critical
/// sections, so the inner value is still consistent after a poison.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
