use core::ptr::null_mut;
use kernel_frames::PhysicalAddress;

/// Link stored in the first bytes of every **free** frame.
///
/// A pooled frame has the following layout:
///
/// ```text
/// +---------------+---------------------------------------+
/// | FreeNode      |     poisoned remainder of the frame   |
/// +---------------+---------------------------------------+
/// ^ frame base    ^ frame base + size_of::<FreeNode>()
/// ```
///
/// Because a free frame holds no live contents, its own storage carries the
/// link to the next free frame; no separate node allocation exists. The node
/// is dead the moment [`FramePool::pop`] hands the frame out.
#[repr(C)]
struct FreeNode {
    next: *mut FreeNode,
}

/// LIFO pool of free frames, linked through the frames' own storage.
///
/// # Invariants
/// - Every linked frame lies inside the managed region, has reference
///   count 0, and is reachable through no live mapping.
/// - `len` equals the number of linked frames.
pub(crate) struct FramePool {
    head: *mut FreeNode,
    len: usize,
}

// Safety: the pool is only used under a SpinLock; the raw links are never
// touched without holding it.
unsafe impl Send for FramePool {}

impl FramePool {
    pub(crate) const fn new() -> Self {
        Self {
            head: null_mut(),
            len: 0,
        }
    }

    /// Number of pooled frames.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Push `frame` onto the pool, writing the link into its first bytes.
    ///
    /// # Safety
    /// - `frame` must be the frame-aligned base of writable memory exclusive
    ///   to the allocator: no live owner, and not already pooled.
    pub(crate) unsafe fn push(&mut self, frame: PhysicalAddress) {
        let node = frame.as_mut_ptr::<FreeNode>();
        unsafe {
            (*node).next = self.head;
        }
        self.head = node;
        self.len += 1;
    }

    /// Pop the most recently pushed frame, or `None` when the pool is empty.
    ///
    /// # Safety
    /// - All previously pushed frames must still be unallocated; the link is
    ///   read out of the head frame itself.
    pub(crate) unsafe fn pop(&mut self) -> Option<PhysicalAddress> {
        if self.head.is_null() {
            return None;
        }
        let node = self.head;
        self.head = unsafe { (*node).next };
        self.len -= 1;
        Some(PhysicalAddress::from_ptr(node))
    }
}
