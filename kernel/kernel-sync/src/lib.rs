//! # Kernel synchronization primitives
//!
//! Busy-wait primitives usable before a scheduler exists and from interrupt
//! paths: nothing here ever sleeps.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod init_cell;
mod spin_lock;

pub use init_cell::InitCell;
pub use spin_lock::{SpinLock, SpinLockGuard};
