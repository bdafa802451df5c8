//! Page-aligned in-process arena standing in for a physical memory range.

use kernel_frames::{FRAME_SIZE, PhysicalAddress};
use kernel_pmm::FrameAllocator;

/// One frame worth of page-aligned backing memory.
#[repr(C, align(4096))]
#[derive(Clone)]
pub struct FrameBuf(pub [u8; FRAME_SIZE as usize]);

pub struct Arena {
    mem: Vec<FrameBuf>,
}

#[allow(dead_code)] // not every test binary uses every helper
impl Arena {
    pub fn new(frames: usize) -> Self {
        Self {
            mem: vec![FrameBuf([0; FRAME_SIZE as usize]); frames],
        }
    }

    /// The arena's bounds as a physical address range.
    pub fn bounds(&mut self) -> (PhysicalAddress, PhysicalAddress) {
        let start = PhysicalAddress::from_ptr(self.mem.as_mut_ptr().cast_const());
        let end = start + self.mem.len() as u64 * FRAME_SIZE;
        (start, end)
    }

    /// An allocator over the whole arena. The arena must outlive it.
    pub fn allocator(&mut self) -> FrameAllocator {
        let (start, end) = self.bounds();
        // Safety: the arena memory is exclusive to the allocator for the
        // duration of the test and holds no live data.
        unsafe { FrameAllocator::new(start, end) }.expect("arena too small")
    }
}
