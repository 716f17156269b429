//! Memory statistics and wall-clock sources
//!
//! Both are host facilities; the profiler only sees them through
//! [`SnapshotProvider`] and [`Clock`].

mod allocator;

pub use allocator::{live_allocations, AllocationTotals, AllocatorSnapshots, CountingAllocator};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Allocator statistics at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Bytes currently allocated
    pub size: u64,
    /// Blocks currently allocated
    pub nblocks: u64,
    /// Allocation cluster granularity in bytes
    pub cluster_size: u64,
    /// Allocation page granularity in bytes
    pub page_size: u64,
}

/// Source of memory statistics
pub trait SnapshotProvider: Send + Sync {
    /// Statistics right now
    fn current(&self) -> MemoryStats;
}

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_ms(&self) -> u64;
}

/// Wall clock backed by [`SystemTime`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        // A clock set before 1970 reads as the epoch
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `start_ms`
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::Relaxed);
    }

    /// Jump to an absolute time
    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}

/// Provider replaying a scripted sequence of snapshots
///
/// The last snapshot repeats once the sequence is exhausted.
#[derive(Debug)]
pub struct FixedSnapshots {
    queue: Mutex<(VecDeque<MemoryStats>, MemoryStats)>,
}

impl FixedSnapshots {
    /// Replay `snapshots` in order
    pub fn new(snapshots: impl IntoIterator<Item = MemoryStats>) -> Self {
        Self {
            queue: Mutex::new((snapshots.into_iter().collect(), MemoryStats::default())),
        }
    }

    /// Always report the same snapshot
    pub fn constant(stats: MemoryStats) -> Self {
        Self::new([stats])
    }
}

impl SnapshotProvider for FixedSnapshots {
    fn current(&self) -> MemoryStats {
        let mut guard = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let (pending, last) = &mut *guard;
        if let Some(next) = pending.pop_front() {
            *last = next;
        }
        *last
    }
}
