use core::{
    cell::UnsafeCell,
    mem::MaybeUninit,
    sync::atomic::{AtomicU8, Ordering},
};

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;

/// A cell that is written exactly once and readable from any context.
///
/// Unlike a `get_or_init` style cell, a second write is *rejected* rather
/// than merged with the first. This is the right shape for state that must
/// be established exactly once during boot: attempting to establish it again
/// is a bug the caller should see.
pub struct InitCell<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

// Safety: exactly one writer publishes the value with Release; readers only
// dereference after observing READY with Acquire.
unsafe impl<T: Send + Sync> Sync for InitCell<T> {}
unsafe impl<T: Send> Send for InitCell<T> {}

impl<T> InitCell<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// The stored value, once a [`set`](Self::set) has completed.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        if self.state.load(Ordering::Acquire) == READY {
            // Safety: READY guarantees the write is done
            Some(unsafe { &*(*self.value.get()).as_ptr() })
        } else {
            None
        }
    }

    /// Store `value`, returning a reference to it.
    ///
    /// # Errors
    /// If the cell is already initialized (or another context is mid-write),
    /// `value` is handed back untouched.
    pub fn set(&self, value: T) -> Result<&T, T> {
        if self
            .state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(value);
        }
        unsafe {
            (*self.value.get()).write(value);
        }
        // Publish the value before marking READY
        self.state.store(READY, Ordering::Release);
        // Safety: just wrote it
        Ok(unsafe { &*(*self.value.get()).as_ptr() })
    }
}

impl<T> Default for InitCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for InitCell<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == READY {
            // Safety: READY means the value was written and never dropped.
            unsafe { self.value.get_mut().assume_init_drop() };
        }
    }
}
