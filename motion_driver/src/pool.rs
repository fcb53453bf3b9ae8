//! Fixed-capacity trajectory buffer pool.
//!
//! Storage is allocated once in [`BufferPool::new`]. A `u64` bitmap tracks
//! free blocks (bit set = free): `allocate` claims a bit with a CAS loop,
//! release sets it back with a single `fetch_or`. Neither path blocks, so
//! both are usable from the tick context.
//!
//! Blocks are handed out as RAII handles. Dropping a handle releases its
//! block; there is no explicit `free`.

use core::cell::UnsafeCell;
use core::fmt;
use core::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use motion_common::consts::POOL_CAPACITY_MAX;
use motion_common::trajectory::{TrajectoryBuffer, TrajectoryError};
use static_assertions::{assert_impl_all, assert_not_impl_any};
use thiserror::Error;

/// Pool construction errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("pool capacity {requested} out of range [1, {max}]")]
    InvalidCapacity { requested: usize, max: usize },
}

/// Fixed set of trajectory buffers.
pub struct BufferPool {
    blocks: Box<[UnsafeCell<TrajectoryBuffer>]>,
    free: AtomicU64,
}

// SAFETY: a block is only reachable through the single handle that cleared
// its bit in `free`, so no two threads ever alias one `UnsafeCell`.
unsafe impl Sync for BufferPool {}

impl BufferPool {
    /// Allocate `capacity` blocks up front.
    pub fn new(capacity: usize) -> Result<Arc<Self>, PoolError> {
        if capacity == 0 || capacity > POOL_CAPACITY_MAX {
            return Err(PoolError::InvalidCapacity {
                requested: capacity,
                max: POOL_CAPACITY_MAX,
            });
        }
        let blocks = (0..capacity)
            .map(|_| UnsafeCell::new(TrajectoryBuffer::new()))
            .collect();
        Ok(Arc::new(Self {
            blocks,
            free: AtomicU64::new(full_mask(capacity)),
        }))
    }

    /// Claim a cleared buffer, or `None` immediately when all blocks are out.
    pub fn allocate(self: &Arc<Self>) -> Option<TrajectoryBuf> {
        let mut free = self.free.load(Ordering::Acquire);
        loop {
            if free == 0 {
                return None;
            }
            let index = free.trailing_zeros() as usize;
            let bit = 1u64 << index;
            match self
                .free
                .compare_exchange_weak(free, free & !bit, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    let handle = BlockHandle {
                        pool: Arc::clone(self),
                        index,
                        owned: true,
                    };
                    let mut buf = TrajectoryBuf { handle };
                    buf.clear();
                    return Some(buf);
                }
                Err(actual) => free = actual,
            }
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.blocks.len()
    }

    /// Blocks currently free.
    #[inline]
    pub fn available(&self) -> usize {
        self.free.load(Ordering::Acquire).count_ones() as usize
    }

    /// Blocks currently held by handles.
    #[inline]
    pub fn outstanding(&self) -> usize {
        self.capacity() - self.available()
    }

    fn release(&self, index: usize) {
        let bit = 1u64 << index;
        let prev = self.free.fetch_or(bit, Ordering::Release);
        debug_assert_eq!(prev & bit, 0, "block {index} released twice");
    }

    /// # Safety
    /// Caller must hold the unique handle for `index`.
    #[inline]
    unsafe fn block(&self, index: usize) -> &TrajectoryBuffer {
        unsafe { &*self.blocks[index].get() }
    }

    /// # Safety
    /// Caller must hold the unique handle for `index` mutably.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    unsafe fn block_mut(&self, index: usize) -> &mut TrajectoryBuffer {
        unsafe { &mut *self.blocks[index].get() }
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("capacity", &self.capacity())
            .field("available", &self.available())
            .finish()
    }
}

const fn full_mask(capacity: usize) -> u64 {
    if capacity >= u64::BITS as usize {
        u64::MAX
    } else {
        (1u64 << capacity) - 1
    }
}

// ─── Handles ────────────────────────────────────────────────────────

struct BlockHandle {
    pool: Arc<BufferPool>,
    index: usize,
    owned: bool,
}

impl Drop for BlockHandle {
    fn drop(&mut self) {
        if self.owned {
            self.pool.release(self.index);
        }
    }
}

/// Mutable buffer owned by a producer. Released on drop.
pub struct TrajectoryBuf {
    handle: BlockHandle,
}

impl TrajectoryBuf {
    /// Validate and freeze. On failure the block is released.
    pub fn seal(self) -> Result<SealedTrajectory, TrajectoryError> {
        self.validate()?;
        Ok(SealedTrajectory {
            handle: self.handle,
        })
    }

    /// Pool block index.
    #[inline]
    pub fn index(&self) -> usize {
        self.handle.index
    }
}

impl Deref for TrajectoryBuf {
    type Target = TrajectoryBuffer;

    fn deref(&self) -> &TrajectoryBuffer {
        // SAFETY: this handle is the unique owner of the block.
        unsafe { self.handle.pool.block(self.handle.index) }
    }
}

impl DerefMut for TrajectoryBuf {
    fn deref_mut(&mut self) -> &mut TrajectoryBuffer {
        // SAFETY: unique owner, borrowed mutably.
        unsafe { self.handle.pool.block_mut(self.handle.index) }
    }
}

impl fmt::Debug for TrajectoryBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrajectoryBuf")
            .field("index", &self.handle.index)
            .field("buffer", &**self)
            .finish()
    }
}

/// Validated, read-only buffer. The only form the queue and slots carry.
pub struct SealedTrajectory {
    handle: BlockHandle,
}

impl SealedTrajectory {
    /// Pool block index.
    #[inline]
    pub fn index(&self) -> usize {
        self.handle.index
    }

    /// True if this buffer's block lives in `pool`.
    #[inline]
    pub fn belongs_to(&self, pool: &Arc<BufferPool>) -> bool {
        Arc::ptr_eq(&self.handle.pool, pool)
    }

    /// Give up ownership without releasing; the block stays claimed.
    pub(crate) fn into_index(mut self) -> usize {
        self.handle.owned = false;
        self.handle.index
    }

    /// Reclaim a block previously passed through [`SealedTrajectory::into_index`].
    ///
    /// # Safety
    /// `index` must come from `into_index` on a buffer of `pool`, and must
    /// not be reclaimed twice.
    pub(crate) unsafe fn from_index(pool: &Arc<BufferPool>, index: usize) -> Self {
        Self {
            handle: BlockHandle {
                pool: Arc::clone(pool),
                index,
                owned: true,
            },
        }
    }
}

impl Deref for SealedTrajectory {
    type Target = TrajectoryBuffer;

    fn deref(&self) -> &TrajectoryBuffer {
        // SAFETY: this handle is the unique owner of the block.
        unsafe { self.handle.pool.block(self.handle.index) }
    }
}

impl fmt::Debug for SealedTrajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedTrajectory")
            .field("index", &self.handle.index)
            .field("buffer", &**self)
            .finish()
    }
}

assert_impl_all!(BufferPool: Send, Sync);
assert_impl_all!(TrajectoryBuf: Send);
assert_impl_all!(SealedTrajectory: Send, Sync);
assert_not_impl_any!(SealedTrajectory: Clone, DerefMut);
