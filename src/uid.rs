//! Monotonic worker identity allocation.
//!
//! OS pids are recycled after a process exits, so a pid alone cannot safely
//! attribute a late outcome signal. Every worker therefore also carries a
//! `WorkerUid` that is unique for the lifetime of the allocator and never
//! reused. The allocator is an explicit value injected at pool construction
//! rather than hidden global state, so independent pools (and tests) get
//! independent, predictable id sequences.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Logical worker identity: monotonically increasing, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerUid(pub u64);

impl fmt::Display for WorkerUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Allocator handing out [`WorkerUid`]s, starting at 1.
///
/// Cheap to clone; clones share the same counter so uids stay unique across
/// every worker built from the same allocator.
#[derive(Debug, Clone, Default)]
pub struct UidAllocator {
    next: Arc<AtomicU64>,
}

impl UidAllocator {
    /// Create a new allocator with its own counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next uid.
    pub fn next_uid(&self) -> WorkerUid {
        WorkerUid(self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uids_are_monotonic_and_unique() {
        let alloc = UidAllocator::new();
        let a = alloc.next_uid();
        let b = alloc.next_uid();
        let c = alloc.next_uid();
        assert!(a < b && b < c);
        assert_eq!(a, WorkerUid(1));
    }

    #[test]
    fn test_clones_share_the_counter() {
        let alloc = UidAllocator::new();
        let clone = alloc.clone();
        let a = alloc.next_uid();
        let b = clone.next_uid();
        assert_ne!(a, b);
    }

    #[test]
    fn test_independent_allocators_restart() {
        let a = UidAllocator::new();
        let b = UidAllocator::new();
        assert_eq!(a.next_uid(), b.next_uid());
    }

    #[test]
    fn test_display() {
        assert_eq!(WorkerUid(42).to_string(), "w42");
    }
}
