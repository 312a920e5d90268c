use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// A held admission slot. Dropping it frees the slot.
pub(super) type Slot = OwnedSemaphorePermit;

/// Counting limiter on the number of jobs executing at once.
#[derive(Debug)]
pub(super) struct AdmissionGate {
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionGate {
    pub(super) fn new(capacity: NonZeroUsize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity.get())),
            capacity: capacity.get(),
        }
    }

    /// Waits for a free slot. Only fails if the gate has been closed, which
    /// nothing in the store does.
    pub(super) async fn acquire(&self) -> Result<Slot, AcquireError> {
        Arc::clone(&self.slots).acquire_owned().await
    }

    pub(super) fn capacity(&self) -> usize {
        self.capacity
    }

    #[cfg(test)]
    pub(super) fn available(&self) -> usize {
        self.slots.available_permits()
    }
}
