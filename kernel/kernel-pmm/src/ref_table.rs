use core::ptr;

/// Per-frame owner counts, indexed by frame index.
///
/// The storage is a raw `u32` array carved out of the leading frames of the
/// managed range by the allocator; the table itself never allocates. Counts
/// mean: 0 — pooled or never handed out; 1 — allocated, single owner;
/// ≥ 2 — shared (copy-on-write).
pub(crate) struct RefTable {
    counts: *mut u32,
    len: usize,
}

// Safety: the table is only used under a SpinLock.
unsafe impl Send for RefTable {}

impl RefTable {
    /// Take ownership of `len` counters at `counts` and zero them all.
    ///
    /// # Safety
    /// - `counts` must point to valid, u32-aligned, writable storage for
    ///   `len` counters, exclusive to this table for its whole lifetime.
    pub(crate) unsafe fn new(counts: *mut u32, len: usize) -> Self {
        unsafe { ptr::write_bytes(counts, 0, len) };
        Self { counts, len }
    }

    /// Current count for frame `index`.
    pub(crate) fn count(&self, index: usize) -> u32 {
        debug_assert!(index < self.len, "frame index out of table bounds");
        unsafe { *self.counts.add(index) }
    }

    /// Overwrite the count for frame `index`.
    pub(crate) fn set(&mut self, index: usize, count: u32) {
        debug_assert!(index < self.len, "frame index out of table bounds");
        unsafe { *self.counts.add(index) = count };
    }

    /// Increment and return the new count.
    pub(crate) fn increment(&mut self, index: usize) -> u32 {
        let count = self.count(index) + 1;
        self.set(index, count);
        count
    }

    /// Decrement and return the new count, or `None` if it was already 0.
    pub(crate) fn try_decrement(&mut self, index: usize) -> Option<u32> {
        let count = self.count(index).checked_sub(1)?;
        self.set(index, count);
        Some(count)
    }
}
