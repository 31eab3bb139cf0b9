//! Shared device handles.
//!
//! The control cycle and the buffer mover both talk to the same controller,
//! so each axis owns its device behind an `Arc<Mutex<_>>`. A poisoned lock is
//! recovered rather than propagated; the guarded state is plain controller I/O.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type SharedDevice<D> = Arc<Mutex<D>>;

/// Wrap a controller for sharing between the control cycle and its mover.
pub fn shared<D>(device: D) -> SharedDevice<D> {
    Arc::new(Mutex::new(device))
}

pub(crate) fn lock<D>(device: &SharedDevice<D>) -> MutexGuard<'_, D> {
    device.lock().unwrap_or_else(PoisonError::into_inner)
}
