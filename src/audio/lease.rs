// Scoped ownership of platform audio resources
//
// A Lease releases its resource exactly once: either through an explicit
// `release()` or when the lease is dropped (error paths, cancelled futures,
// disposed sessions).

use std::sync::Arc;
use tracing::debug;

use super::backend::Release;

pub struct Lease<R: Release + ?Sized> {
    label: &'static str,
    resource: Option<Arc<R>>,
}

impl<R: Release + ?Sized> Lease<R> {
    pub fn new(label: &'static str, resource: Arc<R>) -> Self {
        Self {
            label,
            resource: Some(resource),
        }
    }

    /// Shared handle for awaiting resource operations outside a lock
    pub fn handle(&self) -> Arc<R> {
        match &self.resource {
            Some(resource) => Arc::clone(resource),
            None => unreachable!("lease resource is only taken on release"),
        }
    }

    pub fn release(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(resource) = self.resource.take() {
            debug!("Releasing {}", self.label);
            resource.release();
        }
    }
}

impl<R: Release + ?Sized> Drop for Lease<R> {
    fn drop(&mut self) {
        self.release_now();
    }
}
