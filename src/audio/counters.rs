use std::sync::atomic::{AtomicUsize, Ordering};

/// Running totals of resource operations performed by a backend
#[derive(Debug, Default)]
pub struct ResourceCounters {
    acquired: AtomicUsize,
    released: AtomicUsize,
    operations: AtomicUsize,
}

/// Point-in-time copy of [`ResourceCounters`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    /// Resources handed out by the backend
    pub acquired: usize,
    /// Resources handed back, at most once each
    pub released: usize,
    /// Every call that touched a resource (acquire, play, pause, stop, finalize, release)
    pub operations: usize,
}

impl CounterSnapshot {
    /// Resources acquired but not yet released
    pub fn outstanding(&self) -> usize {
        self.acquired.saturating_sub(self.released)
    }
}

impl ResourceCounters {
    pub fn record_acquire(&self) {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        self.record_operation();
    }

    pub fn record_release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.record_operation();
    }

    pub fn record_operation(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            acquired: self.acquired.load(Ordering::SeqCst),
            released: self.released.load(Ordering::SeqCst),
            operations: self.operations.load(Ordering::SeqCst),
        }
    }
}
