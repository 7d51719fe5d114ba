// src/snapshot.rs

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

const NONE: usize = usize::MAX;

/// Two-slot handoff for the last rendered block.
///
/// The audio thread writes into whichever slot is not currently published
/// and then flips the published index; the UI thread copies out of the
/// published slot. The writer only ever `try_lock`s, so a slow reader costs
/// one skipped publish, never a blocked callback.
pub struct SnapshotBuffer {
    slots: [Mutex<Vec<f32>>; 2],
    published: AtomicUsize,
}

impl SnapshotBuffer {
    /// Slots are preallocated to `capacity` samples so steady-state publishes
    /// do not allocate.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: [
                Mutex::new(Vec::with_capacity(capacity)),
                Mutex::new(Vec::with_capacity(capacity)),
            ],
            published: AtomicUsize::new(NONE),
        }
    }

    /// Called from the audio thread.
    pub fn publish(&self, block: &[f32]) {
        let target = match self.published.load(Ordering::Acquire) {
            0 => 1,
            _ => 0,
        };
        let Ok(mut slot) = self.slots[target].try_lock() else {
            return;
        };
        slot.clear();
        slot.extend_from_slice(block);
        drop(slot);
        self.published.store(target, Ordering::Release);
    }

    /// Copy the most recently published block into `out`. Returns false if
    /// nothing has been published since the last `clear`.
    pub fn read_into(&self, out: &mut Vec<f32>) -> bool {
        let idx = self.published.load(Ordering::Acquire);
        if idx == NONE {
            return false;
        }
        let slot = self.slots[idx].lock().unwrap_or_else(|e| e.into_inner());
        out.clear();
        out.extend_from_slice(&slot);
        true
    }

    pub fn has_data(&self) -> bool {
        self.published.load(Ordering::Acquire) != NONE
    }

    pub fn clear(&self) {
        self.published.store(NONE, Ordering::Release);
    }
}
