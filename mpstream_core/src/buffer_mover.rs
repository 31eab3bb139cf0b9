//! Background top → bottom buffer transfer.
//!
//! Spawns a thread that holds a clone of the axis' shared device handle and
//! calls `process_motion_profile_buffer` at a fixed rate. It runs from
//! construction until drop, whatever the streaming state; a pass over empty
//! buffers is a no-op on the device.
//!
//! Each `BufferMover` spawns exactly one thread that is shut down and joined
//! when the `BufferMover` is dropped.
use crossbeam_channel as xch;
use mpstream_traits::MotorController;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::device::{SharedDevice, lock};

pub struct BufferMover {
    /// Dropping the sender wakes the thread immediately.
    stop_tx: Option<xch::Sender<()>>,
    passes: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl BufferMover {
    pub fn spawn<D>(label: &'static str, device: SharedDevice<D>, period: Duration) -> Self
    where
        D: MotorController + Send + 'static,
    {
        let (stop_tx, stop_rx) = xch::bounded::<()>(0);
        let ticker = xch::tick(period.max(Duration::from_millis(1)));
        let passes = Arc::new(AtomicU64::new(0));
        let passes_clone = passes.clone();
        let failures = Arc::new(AtomicU64::new(0));
        let failures_clone = failures.clone();

        let join_handle = std::thread::spawn(move || {
            let mut failing = false;
            loop {
                xch::select! {
                    recv(stop_rx) -> _ => {
                        tracing::debug!(axis = label, "buffer mover received shutdown signal");
                        break;
                    }
                    recv(ticker) -> _ => {}
                }

                let res = lock(&device).process_motion_profile_buffer();
                passes_clone.fetch_add(1, Ordering::Relaxed);
                match res {
                    Ok(()) => {
                        if failing {
                            tracing::info!(axis = label, "buffer mover recovered");
                            failing = false;
                        }
                    }
                    Err(e) => {
                        failures_clone.fetch_add(1, Ordering::Relaxed);
                        // Log the first failure of a streak only
                        if !failing {
                            tracing::warn!(axis = label, error = %e, "buffer transfer failed");
                            failing = true;
                        }
                    }
                }
            }
            tracing::trace!(axis = label, "buffer mover thread exiting cleanly");
        });

        Self {
            stop_tx: Some(stop_tx),
            passes,
            failures,
            join_handle: Some(join_handle),
        }
    }

    /// Transfer passes attempted so far.
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    /// Passes whose device call failed.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

impl Drop for BufferMover {
    fn drop(&mut self) {
        // Disconnects the stop channel; the select above returns at once
        drop(self.stop_tx.take());

        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("buffer mover thread joined successfully");
                }
                Err(e) => {
                    tracing::warn!(?e, "buffer mover thread panicked during shutdown");
                }
            }
        }
    }
}
