//! Worker id allocation.
//!
//! Hands out strictly increasing ids from an atomic counter. Ids are
//! never reused, including after a worker is evicted and comes back.

use std::sync::atomic::{AtomicU64, Ordering};

use simhub_proto::WorkerId;

/// Monotonic generator for `WorkerId`s. The first id is 1.
#[derive(Debug)]
pub struct ServiceIdAllocator {
    next: AtomicU64,
}

impl ServiceIdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next id.
    pub fn next(&self) -> WorkerId {
        WorkerId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of ids handed out so far.
    #[cfg(test)]
    fn allocated(&self) -> u64 {
        self.next.load(Ordering::Relaxed) - 1
    }
}

impl Default for ServiceIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increase() {
        let ids = ServiceIdAllocator::new();
        assert_eq!(ids.allocated(), 0);
        assert_eq!(ids.next(), WorkerId(1));
        assert_eq!(ids.next(), WorkerId(2));
        assert_eq!(ids.next(), WorkerId(3));
        assert_eq!(ids.allocated(), 3);
    }

    #[test]
    fn concurrent_allocation_never_repeats() {
        use std::collections::HashSet;
        use std::sync::Arc;
        use std::thread;

        let ids = Arc::new(ServiceIdAllocator::new());
        let mut handles = vec![];

        for _ in 0..4 {
            let ids = ids.clone();
            handles.push(thread::spawn(move || {
                (0..100).map(|_| ids.next()).collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }

        assert_eq!(seen.len(), 400);
        assert_eq!(ids.allocated(), 400);
    }
}
