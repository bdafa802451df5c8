//! # Physical Memory Manager
//!
//! The physical frame allocator for the kernel: it owns the pool of 4 KiB
//! frames available after boot, hands them out to page tables, kernel
//! stacks, and buffers, and reclaims them. Per frame it tracks how many
//! owners currently hold a claim, which is what makes copy-on-write sharing
//! of a single frame across several address spaces possible.
//!
//! ## Structure
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 FrameAllocator                  │
//! │ allocate / release / add_reference /            │
//! │ remove_reference / frame_index                  │
//! └───────────┬───────────────────────┬─────────────┘
//!             │                       │
//! ┌───────────▼───────────┐ ┌─────────▼─────────────┐
//! │ Frame Pool            │ │ Reference Table       │
//! │ intrusive LIFO list   │ │ one u32 per frame     │
//! │ through free frames   │ │ carved from the range │
//! │ (own SpinLock)        │ │ (own SpinLock)        │
//! └───────────────────────┘ └───────────────────────┘
//! ```
//!
//! ## Frame lifecycle
//!
//! A frame starts unmanaged, enters the pool with count 0 during
//! initialization, becomes allocated (count 1) via
//! [`FrameAllocator::allocate`], may become shared (count ≥ 2) via
//! [`FrameAllocator::add_reference`], and returns to the pool only when a
//! decrement observes the count reaching 0. A frame is always in exactly one
//! of the two structures: pooled with count 0, or allocated with count ≥ 1.
//!
//! ## Locking
//!
//! The pool and the table live under two independent spin locks. Most
//! operations take them one after the other. The reclaim paths are the
//! exception: they keep the table lock held while poisoning the frame and
//! pushing it onto the pool, so a racing `add_reference` can never revive a
//! frame that is already on its way back. The nesting order is therefore
//! always *table, then pool*, and never the reverse.
//!
//! Reclaimed frames are overwritten with [`POISON_BYTE`] so dangling holders
//! read a recognizable pattern instead of plausible stale data.
//!
//! ## Usage
//!
//! ```rust,ignore
//! // At boot, with the usable range discovered by the loader:
//! let pmm = unsafe { kernel_pmm::init(range_start, range_end)? };
//!
//! let frame = pmm.allocate().ok_or(Errno::NoMem)?;
//! // map it, share it, ...
//! pmm.add_reference(frame)?;
//! // ... and let each owner drop its claim:
//! pmm.remove_reference(frame)?;
//! pmm.remove_reference(frame)?; // last owner; frame returns to the pool
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code, clippy::cast_possible_truncation)]

pub mod frame_alloc;
mod free_list;
mod ref_table;

pub use frame_alloc::{FrameAllocator, FrameError, InitError, POISON_BYTE};

use kernel_frames::PhysicalAddress;
use kernel_sync::InitCell;

static ALLOCATOR: InitCell<FrameAllocator> = InitCell::new();

/// Bring up the process-wide frame allocator over `[start, end)`.
///
/// # Errors
/// [`InitError::AlreadyInitialized`] on any call after the first; otherwise
/// whatever [`FrameAllocator::new`] reports. The memory range is not touched
/// when a second call is rejected.
///
/// # Safety
/// Same contract as [`FrameAllocator::new`]: the range must be valid,
/// writable memory exclusive to the allocator, holding no live data.
pub unsafe fn init(
    start: PhysicalAddress,
    end: PhysicalAddress,
) -> Result<&'static FrameAllocator, InitError> {
    if ALLOCATOR.get().is_some() {
        return Err(InitError::AlreadyInitialized);
    }
    let allocator = unsafe { FrameAllocator::new(start, end)? };
    ALLOCATOR
        .set(allocator)
        .map_err(|_| InitError::AlreadyInitialized)
}

/// The process-wide allocator, if [`init`] has completed.
#[must_use]
pub fn try_get() -> Option<&'static FrameAllocator> {
    ALLOCATOR.get()
}

/// The process-wide allocator.
///
/// # Panics
/// If [`init`] has not run.
#[must_use]
pub fn get() -> &'static FrameAllocator {
    ALLOCATOR.get().expect("frame allocator used before init")
}
