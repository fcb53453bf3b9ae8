//! Pending buffer slot shared by the worker and the tick handler.
//!
//! The slot stores the pool index of its occupant in an `AtomicUsize`
//! (`EMPTY` when vacant), so both `replace` and `take` are one atomic swap
//! and never block.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::pool::{BufferPool, SealedTrajectory};

const EMPTY: usize = usize::MAX;

/// Holds at most one buffer waiting to become active.
#[derive(Debug)]
pub struct PendingSlot {
    pool: Arc<BufferPool>,
    index: AtomicUsize,
}

impl PendingSlot {
    /// Empty slot accepting buffers from `pool`.
    pub fn new(pool: Arc<BufferPool>) -> Self {
        Self {
            pool,
            index: AtomicUsize::new(EMPTY),
        }
    }

    /// Install `buffer`, returning the occupant it displaced.
    ///
    /// # Errors
    /// Returns `buffer` unchanged if it was allocated from another pool.
    pub fn replace(
        &self,
        buffer: SealedTrajectory,
    ) -> Result<Option<SealedTrajectory>, SealedTrajectory> {
        if !buffer.belongs_to(&self.pool) {
            return Err(buffer);
        }
        let prev = self.index.swap(buffer.into_index(), Ordering::AcqRel);
        Ok(self.reclaim(prev))
    }

    /// Remove and return the occupant.
    pub fn take(&self) -> Option<SealedTrajectory> {
        let prev = self.index.swap(EMPTY, Ordering::AcqRel);
        self.reclaim(prev)
    }

    pub fn is_occupied(&self) -> bool {
        self.index.load(Ordering::Acquire) != EMPTY
    }

    fn reclaim(&self, index: usize) -> Option<SealedTrajectory> {
        if index == EMPTY {
            return None;
        }
        // SAFETY: only `replace` stores non-EMPTY indices, each from
        // `into_index` on a buffer of `self.pool`; the swap that read it
        // out removed it, so it is reclaimed exactly once.
        Some(unsafe { SealedTrajectory::from_index(&self.pool, index) })
    }
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        drop(self.take());
    }
}
