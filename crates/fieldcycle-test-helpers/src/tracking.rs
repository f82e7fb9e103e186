//! Allocation tracking for RT safety tests.
//!
//! Install [`TrackingAllocator`] as the global allocator of a test binary,
//! then wrap the code under test in [`track`]:
//!
//! ```rust,ignore
//! use fieldcycle_test_helpers::tracking::{TrackingAllocator, track};
//!
//! #[global_allocator]
//! static GLOBAL: TrackingAllocator = TrackingAllocator;
//!
//! let guard = track();
//! pipeline.execute(cycle);
//! assert_eq!(guard.allocations(), 0);
//! ```
//!
//! Counting is per thread, so allocations made by other test threads never
//! show up in a guard.

#![allow(unsafe_code, reason = "GlobalAlloc is an unsafe trait")]

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

thread_local! {
    static ALLOCATION_COUNT: Cell<usize> = const { Cell::new(0) };
    static ALLOCATION_BYTES: Cell<usize> = const { Cell::new(0) };
    static TRACKING_ENABLED: Cell<bool> = const { Cell::new(false) };
}

fn record(bytes: usize) {
    if TRACKING_ENABLED.with(Cell::get) {
        ALLOCATION_COUNT.with(|count| count.set(count.get().saturating_add(1)));
        ALLOCATION_BYTES.with(|total| total.set(total.get().saturating_add(bytes)));
    }
}

/// System allocator that counts allocations on threads with an active guard.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackingAllocator;

// SAFETY: every call is forwarded unchanged to `System`; the bookkeeping
// only touches const-initialized thread locals and never allocates.
unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: same contract as `GlobalAlloc::alloc`.
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            record(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: `ptr` was allocated by `System` with `layout`.
        unsafe { System.dealloc(ptr, layout) };
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: same contract as `GlobalAlloc::realloc`.
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() && new_size > layout.size() {
            record(new_size - layout.size());
        }
        new_ptr
    }
}

/// Counts allocations on the current thread while alive.
#[derive(Debug)]
pub struct AllocationGuard {
    start_count: usize,
    start_bytes: usize,
}

impl AllocationGuard {
    /// Start counting on the current thread
    pub fn new() -> Self {
        TRACKING_ENABLED.with(|e| e.set(true));
        Self {
            start_count: ALLOCATION_COUNT.with(Cell::get),
            start_bytes: ALLOCATION_BYTES.with(Cell::get),
        }
    }

    /// Allocations since the guard was created
    pub fn allocations(&self) -> usize {
        ALLOCATION_COUNT
            .with(Cell::get)
            .saturating_sub(self.start_count)
    }

    /// Bytes allocated since the guard was created
    pub fn bytes(&self) -> usize {
        ALLOCATION_BYTES
            .with(Cell::get)
            .saturating_sub(self.start_bytes)
    }
}

impl Default for AllocationGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AllocationGuard {
    fn drop(&mut self) {
        TRACKING_ENABLED.with(|e| e.set(false));
    }
}

/// Start an [`AllocationGuard`]
pub fn track() -> AllocationGuard {
    AllocationGuard::new()
}

/// Panic if `guard` saw any allocation.
#[macro_export]
macro_rules! assert_rt_safe {
    ($guard:expr, $context:expr) => {
        let guard = &$guard;
        let allocs = guard.allocations();
        if allocs > 0 {
            panic!(
                "RT path allocation in '{}': {} allocation(s), {} byte(s)",
                $context,
                allocs,
                guard.bytes()
            );
        }
    };
}
