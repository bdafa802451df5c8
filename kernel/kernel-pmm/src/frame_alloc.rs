//! The allocator API tying the frame pool and the reference table together.

use crate::free_list::FramePool;
use crate::ref_table::RefTable;
use core::ptr;
use kernel_frames::{FRAME_SIZE, FrameRegion, PhysicalAddress};
use kernel_sync::SpinLock;

/// Byte written over a frame's contents when it returns to the pool.
///
/// A dangling holder that reads through a stale mapping sees this pattern
/// instead of plausible data. The first bytes of a pooled frame hold the
/// free-list link and do not show the pattern.
pub const POISON_BYTE: u8 = 0x5A;

/// Invalid frame address handed to the allocator by a caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The address is not a multiple of [`FRAME_SIZE`].
    #[error("address {0} is not frame-aligned")]
    Unaligned(PhysicalAddress),
    /// The address lies outside the managed range.
    #[error("address {0} is outside the managed range")]
    Unmanaged(PhysicalAddress),
    /// The frame's reference count was already zero.
    #[error("frame {0} has no owner left to remove")]
    Unreferenced(PhysicalAddress),
}

/// Failure to bring up an allocator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    /// After alignment and reference-table carving, no allocatable frame
    /// remains in the supplied range.
    #[error("physical range too small to manage")]
    RegionTooSmall,
    /// The process-wide allocator was initialized twice.
    #[error("frame allocator already initialized")]
    AlreadyInitialized,
}

/// Physical frame allocator with per-frame reference counts.
///
/// Frames with count 0 sit in the intrusive free list; frames with count
/// ≥ 1 are allocated, and counts ≥ 2 mean the frame is shared between
/// owners (copy-on-write). The two structures live under independent spin
/// locks; see the crate docs for the locking rules.
pub struct FrameAllocator {
    region: FrameRegion,
    pool: SpinLock<FramePool>,
    refs: SpinLock<RefTable>,
}

impl FrameAllocator {
    /// Bring up an allocator over the physical range `[start, end)`.
    ///
    /// `start` is rounded up to the next frame boundary; a trailing partial
    /// frame is ignored. The leading frames of the rounded range are carved
    /// out to hold the reference table, so the managed range visible through
    /// [`Self::region`] begins after them. Every managed frame is then
    /// released through the ordinary reclaim path, which seeds the free list
    /// and poisons the whole range.
    ///
    /// # Errors
    /// [`InitError::RegionTooSmall`] if no allocatable frame remains after
    /// alignment and table carving.
    ///
    /// # Safety
    /// - `[start, end)` must be valid, writable memory that stays exclusive
    ///   to the allocator for its whole lifetime.
    /// - Nothing may hold live data inside the range; it is overwritten.
    pub unsafe fn new(start: PhysicalAddress, end: PhysicalAddress) -> Result<Self, InitError> {
        let base = start.align_up_to_frame();
        if base.as_u64() >= end.as_u64() {
            return Err(InitError::RegionTooSmall);
        }
        let total = ((end.as_u64() - base.as_u64()) / FRAME_SIZE) as usize;
        let table_frames = (total * size_of::<u32>()).div_ceil(FRAME_SIZE as usize);
        if table_frames >= total {
            return Err(InitError::RegionTooSmall);
        }
        let managed = total - table_frames;
        let region = FrameRegion::new(base + table_frames as u64 * FRAME_SIZE, managed);

        // Safety: the carved frames precede the managed range and belong to
        // the allocator per this function's contract.
        let table = unsafe { RefTable::new(base.as_mut_ptr::<u32>(), managed) };
        let allocator = Self {
            region,
            pool: SpinLock::new(FramePool::new()),
            refs: SpinLock::new(table),
        };

        // Seed the pool through the ordinary release path; every count is
        // still zero, so each frame is poisoned and pushed.
        for (index, frame) in region.frames().enumerate() {
            allocator.release_frame(index, frame);
        }

        log::info!(
            "pmm: managing {managed} frames in {region}, {table_frames} frame(s) carved for the reference table at {base}"
        );
        Ok(allocator)
    }

    /// Allocate one frame, or `None` when the pool is exhausted.
    ///
    /// Exhaustion is a normal outcome for the caller to handle, not a fault.
    /// The frame's reference count is 1 on return. Its contents are whatever
    /// the release path last wrote (the poison pattern and the free-list
    /// link); callers that need zeroed memory must zero it themselves.
    ///
    /// # Panics
    /// If the free list yields an address outside the managed range, which
    /// can only happen when a stale holder corrupted a pooled frame.
    pub fn allocate(&self) -> Option<PhysicalAddress> {
        // Safety: the pool only ever holds seeded, currently free frames.
        let popped = unsafe { self.pool.lock().pop() };
        let Some(frame) = popped else {
            log::trace!("pmm: frame pool exhausted");
            return None;
        };
        let Some(index) = self.region.index_of(frame) else {
            panic!("frame pool returned unmanaged address {frame}");
        };
        self.refs.lock().set(index, 1);
        Some(frame)
    }

    /// Drop one owner's claim on `frame`.
    ///
    /// While the frame is shared (count > 1) this only decrements the count;
    /// the frame stays allocated. Once no other claim remains, the frame is
    /// poisoned and returned to the pool.
    ///
    /// # Panics
    /// A misaligned or unmanaged address is a caller bug that has corrupted
    /// allocator invariants; continuing would risk silent memory corruption,
    /// so this halts. Use [`Self::try_release`] to observe the error
    /// instead.
    pub fn release(&self, frame: PhysicalAddress) {
        if let Err(err) = self.try_release(frame) {
            panic!("release: {err}");
        }
    }

    /// Fallible twin of [`Self::release`].
    ///
    /// # Errors
    /// [`FrameError::Unaligned`] or [`FrameError::Unmanaged`] for an address
    /// this allocator never handed out.
    pub fn try_release(&self, frame: PhysicalAddress) -> Result<(), FrameError> {
        if !frame.is_frame_aligned() {
            return Err(FrameError::Unaligned(frame));
        }
        let index = self
            .region
            .index_of(frame)
            .ok_or(FrameError::Unmanaged(frame))?;
        self.release_frame(index, frame);
        Ok(())
    }

    /// Record one more owner of the frame containing `addr`, returning the
    /// new count.
    ///
    /// Used when a second address space starts sharing a frame, e.g. for a
    /// copy-on-write mapping.
    ///
    /// # Errors
    /// [`FrameError::Unmanaged`] if `addr` is outside the managed range.
    pub fn add_reference(&self, addr: PhysicalAddress) -> Result<u32, FrameError> {
        let index = self
            .region
            .index_of(addr)
            .ok_or(FrameError::Unmanaged(addr))?;
        let mut refs = self.refs.lock();
        debug_assert!(
            refs.count(index) > 0,
            "add_reference on a frame with no owner"
        );
        Ok(refs.increment(index))
    }

    /// Drop one owner of the frame containing `addr`, returning the
    /// remaining count. When the count reaches 0 the frame is poisoned and
    /// returned to the pool.
    ///
    /// This is the copy-on-write teardown path: each address space that
    /// unmaps its view calls this once, and the last owner frees the frame.
    ///
    /// # Errors
    /// [`FrameError::Unmanaged`] if `addr` is outside the managed range;
    /// [`FrameError::Unreferenced`] if the count was already zero.
    pub fn remove_reference(&self, addr: PhysicalAddress) -> Result<u32, FrameError> {
        let index = self
            .region
            .index_of(addr)
            .ok_or(FrameError::Unmanaged(addr))?;
        let mut refs = self.refs.lock();
        let remaining = refs
            .try_decrement(index)
            .ok_or(FrameError::Unreferenced(addr))?;
        if remaining == 0 {
            let frame = self.region.frame_at(index);
            // Table lock stays held across the reclaim; see release_frame.
            unsafe {
                poison(frame);
                self.pool.lock().push(frame);
            }
        }
        Ok(remaining)
    }

    /// Zero-based index of the frame containing `addr`, or `None` for
    /// addresses outside the managed range.
    #[inline]
    #[must_use]
    pub fn frame_index(&self, addr: PhysicalAddress) -> Option<usize> {
        self.region.index_of(addr)
    }

    /// Current owner count of the frame containing `addr`, if managed.
    #[must_use]
    pub fn ref_count(&self, addr: PhysicalAddress) -> Option<u32> {
        let index = self.region.index_of(addr)?;
        Some(self.refs.lock().count(index))
    }

    /// Number of frames currently in the pool.
    #[must_use]
    pub fn free_frames(&self) -> usize {
        self.pool.lock().len()
    }

    /// Total number of managed frames.
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.region.frame_count()
    }

    /// The managed range.
    #[inline]
    #[must_use]
    pub const fn region(&self) -> FrameRegion {
        self.region
    }

    /// Give up one claim on the frame at `index`, reclaiming it once no
    /// claim remains.
    ///
    /// The table lock is held across the poisoning and the pool insertion,
    /// so a racing `add_reference` can never observe the window between
    /// "count hit zero" and "frame pooled". Nesting order is table, then
    /// pool; nothing in this crate nests the other way around.
    fn release_frame(&self, index: usize, frame: PhysicalAddress) {
        let mut refs = self.refs.lock();
        let owners = refs.count(index);
        if owners > 1 {
            // Still shared; the frame stays allocated.
            refs.set(index, owners - 1);
            return;
        }
        refs.set(index, 0);
        // Safety: count 0 under the held table lock means no live owner;
        // the frame base was validated against the region by the caller.
        unsafe {
            poison(frame);
            self.pool.lock().push(frame);
        }
    }
}

/// Overwrite a frame with [`POISON_BYTE`].
///
/// # Safety
/// `frame` must be the frame-aligned base of [`FRAME_SIZE`] bytes of
/// writable memory with no live owner.
unsafe fn poison(frame: PhysicalAddress) {
    unsafe { ptr::write_bytes(frame.as_mut_ptr::<u8>(), POISON_BYTE, FRAME_SIZE as usize) };
}
