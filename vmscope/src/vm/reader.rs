//! The single raw-memory read primitive
//!
//! Every structure view funnels its field reads through [`read_at`], so there
//! is exactly one place to instrument or harden raw VM memory access.

#![allow(unsafe_code)] // reading the target VM's memory requires unsafe

use std::ptr;

/// Read a `T` at `base + offset` in the monitored VM's address space.
///
/// The read is volatile: the VM mutates these words concurrently, and the
/// compiler must not fold, duplicate, or widen the access.
///
/// # Safety
/// `base + offset` must lie within memory mapped into this process. The value
/// read may still be stale or torn; callers must validate it before acting on
/// it.
#[inline]
pub(crate) unsafe fn read_at<T: Copy>(base: usize, offset: usize) -> T {
    ptr::read_volatile(base.wrapping_add(offset) as *const T)
}
