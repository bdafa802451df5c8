//! # Physical Frame Addressing Types
//!
//! Strongly typed wrappers for the raw physical addresses handled by the
//! frame allocator, plus the bounds-checked mapping between addresses and
//! frame indices.
//!
//! ## Overview
//!
//! Frame management code juggles three easily confused kinds of numbers:
//! raw physical addresses, frame base addresses, and zero-based frame
//! indices into per-frame bookkeeping tables. This crate keeps them apart
//! at the type level while staying a zero-cost wrapper around `u64`:
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PhysicalAddress`] | A raw 64-bit physical address. |
//! | [`FrameRegion`] | A frame-aligned half-open range of physical memory. |
//!
//! Conversion from an address to a frame index is only possible through
//! [`FrameRegion::index_of`], which returns `None` for anything outside the
//! region. There is no unchecked path, so out-of-range arithmetic cannot
//! happen silently.
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_frames::*;
//! let region = FrameRegion::new(PhysicalAddress::new(0x10_0000), 64);
//!
//! // Any address within the region maps to the frame that contains it.
//! assert_eq!(region.index_of(PhysicalAddress::new(0x10_1234)), Some(1));
//!
//! // Addresses outside the region are explicitly unmanaged.
//! assert_eq!(region.index_of(PhysicalAddress::new(0x0F_F000)), None);
//! assert_eq!(region.index_of(region.end()), None);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code, clippy::cast_possible_truncation)]

mod frame_region;
mod physical_address;

pub use frame_region::FrameRegion;
pub use physical_address::PhysicalAddress;

/// Size of a physical memory frame in bytes.
pub const FRAME_SIZE: u64 = 4096;

/// log2([`FRAME_SIZE`]), i.e. the number of low offset bits in an address.
pub const FRAME_SHIFT: u32 = 12;
