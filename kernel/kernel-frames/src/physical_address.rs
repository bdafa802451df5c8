use crate::FRAME_SIZE;
use core::fmt;
use core::ops::{Add, AddAssign};
use core::ptr::NonNull;

/// Physical memory address.
///
/// A thin wrapper around `u64` that carries intent: values of this type
/// refer to physical RAM, never to virtual mappings or frame indices.
///
/// ### Semantics
/// - Alignment is not an invariant of the type; use
///   [`PhysicalAddress::is_frame_aligned`] to check and
///   [`PhysicalAddress::align_up_to_frame`] /
///   [`PhysicalAddress::align_down_to_frame`] to adjust.
/// - The pointer accessors assume an environment where physical memory is
///   directly addressable (identity or direct mapping).
///
/// ### Examples
/// ```rust
/// # use kernel_frames::*;
/// let pa = PhysicalAddress::new(0x1234);
/// assert!(!pa.is_frame_aligned());
/// assert_eq!(pa.align_down_to_frame().as_u64(), 0x1000);
/// assert_eq!(pa.align_up_to_frame().as_u64(), 0x2000);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[inline]
    #[must_use]
    pub const fn from_nonnull<T>(ptr: NonNull<T>) -> Self {
        Self::from_ptr(ptr.as_ptr())
    }

    #[inline]
    #[must_use]
    pub const fn from_ptr<T>(ptr: *const T) -> Self {
        const _: () = assert!(
            size_of::<*const ()>() == size_of::<u64>(),
            "pointer size mismatch"
        );

        // using a union to const-time convert a pointer to an u64
        union Ptr<T> {
            ptr: *const T,
            raw: u64,
        }

        let ptr = Ptr { ptr };
        Self::new(unsafe { ptr.raw })
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn as_ptr<T>(self) -> *const T {
        self.0 as usize as *const T
    }

    #[inline]
    #[must_use]
    pub const fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as usize as *mut T
    }

    /// Whether the address is a multiple of [`FRAME_SIZE`].
    #[inline]
    #[must_use]
    pub const fn is_frame_aligned(self) -> bool {
        self.0 & (FRAME_SIZE - 1) == 0
    }

    /// Round down to the containing frame boundary.
    #[inline]
    #[must_use]
    pub const fn align_down_to_frame(self) -> Self {
        Self(self.0 & !(FRAME_SIZE - 1))
    }

    /// Round up to the next frame boundary (identity if already aligned).
    #[inline]
    #[must_use]
    pub const fn align_up_to_frame(self) -> Self {
        Self((self.0 + FRAME_SIZE - 1) & !(FRAME_SIZE - 1))
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.0)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl From<u64> for PhysicalAddress {
    #[inline]
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<PhysicalAddress> for u64 {
    #[inline]
    fn from(addr: PhysicalAddress) -> Self {
        addr.as_u64()
    }
}

impl Add<u64> for PhysicalAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u64> for PhysicalAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}
