//! Counting global allocator and the snapshot provider reading it

use std::alloc::{GlobalAlloc, Layout, System};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{MemoryStats, SnapshotProvider};

// Live totals: allocations add, deallocations subtract.
static LIVE_BYTES: AtomicU64 = AtomicU64::new(0);
static LIVE_BLOCKS: AtomicU64 = AtomicU64::new(0);

/// Live allocation totals across the process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationTotals {
    /// Bytes currently allocated
    pub bytes: u64,
    /// Blocks currently allocated
    pub blocks: u64,
}

/// Read the counters maintained by [`CountingAllocator`]
///
/// Both stay at zero unless a `CountingAllocator` is installed as the global
/// allocator (or called directly).
pub fn live_allocations() -> AllocationTotals {
    AllocationTotals {
        bytes: LIVE_BYTES.load(Ordering::Relaxed),
        blocks: LIVE_BLOCKS.load(Ordering::Relaxed),
    }
}

fn to_u64(size: usize) -> u64 {
    u64::try_from(size).unwrap_or(u64::MAX)
}

/// Allocator wrapper that counts live bytes and blocks
///
/// ```no_run
/// use reqprof::CountingAllocator;
///
/// #[global_allocator]
/// static ALLOCATOR: CountingAllocator = CountingAllocator::system();
///
/// fn main() {}
/// ```
pub struct CountingAllocator<A: GlobalAlloc = System> {
    inner: A,
}

impl<A: GlobalAlloc> fmt::Debug for CountingAllocator<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountingAllocator")
            .field("inner", &"<allocator>")
            .finish()
    }
}

impl CountingAllocator<System> {
    /// Count allocations made through the system allocator
    pub const fn system() -> Self {
        Self { inner: System }
    }
}

impl<A: GlobalAlloc> CountingAllocator<A> {
    /// Count allocations made through `inner`
    pub const fn new(inner: A) -> Self {
        Self { inner }
    }
}

// SAFETY: every call is forwarded unchanged to the wrapped allocator; the
// counters are plain atomics and never allocate.
unsafe impl<A: GlobalAlloc> GlobalAlloc for CountingAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded with the caller's layout.
        let ptr = unsafe { self.inner.alloc(layout) };
        if !ptr.is_null() {
            LIVE_BYTES.fetch_add(to_u64(layout.size()), Ordering::Relaxed);
            LIVE_BLOCKS.fetch_add(1, Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded with the caller's layout.
        let ptr = unsafe { self.inner.alloc_zeroed(layout) };
        if !ptr.is_null() {
            LIVE_BYTES.fetch_add(to_u64(layout.size()), Ordering::Relaxed);
            LIVE_BLOCKS.fetch_add(1, Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: forwarded with the caller's pointer and layout.
        unsafe { self.inner.dealloc(ptr, layout) };
        LIVE_BYTES.fetch_sub(to_u64(layout.size()), Ordering::Relaxed);
        LIVE_BLOCKS.fetch_sub(1, Ordering::Relaxed);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: forwarded with the caller's pointer, layout and size.
        let new_ptr = unsafe { self.inner.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            // Block count is unchanged: one block was resized.
            LIVE_BYTES.fetch_add(to_u64(new_size), Ordering::Relaxed);
            LIVE_BYTES.fetch_sub(to_u64(layout.size()), Ordering::Relaxed);
        }
        new_ptr
    }
}

/// Snapshot provider reading [`CountingAllocator`]'s counters
#[derive(Debug, Clone, Copy)]
pub struct AllocatorSnapshots {
    cluster_size: u64,
    page_size: u64,
}

impl AllocatorSnapshots {
    /// Default cluster granularity reported with each snapshot
    pub const DEFAULT_CLUSTER_SIZE: u64 = 8192;
    /// Default page granularity reported with each snapshot
    pub const DEFAULT_PAGE_SIZE: u64 = 128;

    /// Provider with default granularities
    pub fn new() -> Self {
        Self {
            cluster_size: Self::DEFAULT_CLUSTER_SIZE,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the reported cluster size
    pub fn with_cluster_size(mut self, cluster_size: u64) -> Self {
        self.cluster_size = cluster_size;
        self
    }

    /// Override the reported page size
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }
}

impl SnapshotProvider for AllocatorSnapshots {
    fn current(&self) -> MemoryStats {
        let totals = live_allocations();
        MemoryStats {
            size: totals.bytes,
            nblocks: totals.blocks,
            cluster_size: self.cluster_size,
            page_size: self.page_size,
        }
    }
}
