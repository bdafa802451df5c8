use crate::{FRAME_SHIFT, FRAME_SIZE, PhysicalAddress};
use core::fmt;

/// The contiguous physical range a frame allocator is responsible for.
///
/// The region is the half-open interval `[base, end)` where `base` is frame
/// aligned and `end = base + frame_count * FRAME_SIZE`. Frames are numbered
/// `0..frame_count` from `base`.
///
/// ### Semantics
/// - [`FrameRegion::index_of`] is the single place where addresses are
///   checked against the range boundary; every bookkeeping structure indexed
///   by frame goes through it.
/// - Any address inside a frame maps to that frame's index, not just the
///   frame base.
///
/// ### Examples
/// ```rust
/// # use kernel_frames::*;
/// let region = FrameRegion::new(PhysicalAddress::new(0x20_0000), 4);
/// assert_eq!(region.frame_count(), 4);
/// assert_eq!(region.end().as_u64(), 0x20_4000);
/// assert_eq!(region.index_of(region.base()), Some(0));
/// assert_eq!(region.index_of(region.frame_at(3) + 0xFFF), Some(3));
/// assert_eq!(region.index_of(region.end()), None);
/// ```
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct FrameRegion {
    base: PhysicalAddress,
    frames: usize,
}

impl FrameRegion {
    /// A region of `frames` frames starting at `base`.
    ///
    /// `base` must be frame aligned; debug builds assert this.
    #[inline]
    #[must_use]
    pub fn new(base: PhysicalAddress, frames: usize) -> Self {
        debug_assert!(base.is_frame_aligned(), "unaligned region base");
        Self { base, frames }
    }

    /// First managed address.
    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        self.base
    }

    /// First address past the managed range.
    #[inline]
    #[must_use]
    pub const fn end(self) -> PhysicalAddress {
        PhysicalAddress::new(self.base.as_u64() + self.frames as u64 * FRAME_SIZE)
    }

    /// Number of frames in the region.
    #[inline]
    #[must_use]
    pub const fn frame_count(self) -> usize {
        self.frames
    }

    /// Whether `addr` falls inside the managed range.
    #[inline]
    #[must_use]
    pub const fn contains(self, addr: PhysicalAddress) -> bool {
        addr.as_u64() >= self.base.as_u64() && addr.as_u64() < self.end().as_u64()
    }

    /// Zero-based index of the frame containing `addr`, or `None` for
    /// addresses the region does not manage.
    #[inline]
    #[must_use]
    pub const fn index_of(self, addr: PhysicalAddress) -> Option<usize> {
        if !self.contains(addr) {
            return None;
        }
        Some(((addr.as_u64() - self.base.as_u64()) >> FRAME_SHIFT) as usize)
    }

    /// Base address of frame `index`.
    ///
    /// `index` must be below [`FrameRegion::frame_count`]; debug builds
    /// assert this.
    #[inline]
    #[must_use]
    pub fn frame_at(self, index: usize) -> PhysicalAddress {
        debug_assert!(index < self.frames, "frame index out of range");
        PhysicalAddress::new(self.base.as_u64() + index as u64 * FRAME_SIZE)
    }

    /// Iterator over the base address of every frame, in ascending order.
    pub fn frames(self) -> impl Iterator<Item = PhysicalAddress> {
        (0..self.frames).map(move |index| self.frame_at(index))
    }
}

impl fmt::Debug for FrameRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrameRegion(0x{:016X}..0x{:016X}, {} frames)",
            self.base.as_u64(),
            self.end().as_u64(),
            self.frames
        )
    }
}

impl fmt::Display for FrameRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.base, self.end())
    }
}
