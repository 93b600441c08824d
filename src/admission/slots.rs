//! Fixed-capacity connection slot pool.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::observability::metrics;

/// Counting resource bounding the number of in-flight requests.
///
/// Acquisition never waits: either a slot is free right now or the caller is
/// told the pool is saturated.
#[derive(Debug, Clone)]
pub struct SlotPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl SlotPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Take one slot if available. The slot is returned when the guard drops.
    pub fn try_acquire(&self) -> Option<Slot> {
        let permit = Arc::clone(&self.semaphore).try_acquire_owned().ok()?;
        metrics::slot_acquired();
        Some(Slot { _permit: permit })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held.
    pub fn in_use(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }
}

/// A held connection slot.
///
/// Dropping it releases the slot, so every exit path (early return, error,
/// panic, cancelled future) gives it back exactly once.
#[derive(Debug)]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
}

impl Drop for Slot {
    fn drop(&mut self) {
        metrics::slot_released();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_exceeds_capacity() {
        let pool = SlotPool::new(2);
        let a = pool.try_acquire().expect("first slot");
        let b = pool.try_acquire().expect("second slot");
        assert!(pool.try_acquire().is_none());
        assert_eq!(pool.in_use(), 2);

        drop(a);
        assert_eq!(pool.in_use(), 1);
        let c = pool.try_acquire().expect("slot freed by drop");
        assert!(pool.try_acquire().is_none());

        drop(b);
        drop(c);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn clones_share_the_same_slots() {
        let pool = SlotPool::new(1);
        let other = pool.clone();
        let _slot = pool.try_acquire().unwrap();
        assert!(other.try_acquire().is_none());
        assert_eq!(other.in_use(), 1);
    }

    #[tokio::test]
    async fn concurrent_acquirers_respect_capacity() {
        let pool = SlotPool::new(8);
        let mut tasks = Vec::new();
        for _ in 0..64 {
            let pool = pool.clone();
            tasks.push(tokio::spawn(async move { pool.try_acquire() }));
        }

        let mut held = Vec::new();
        for task in tasks {
            if let Some(slot) = task.await.unwrap() {
                held.push(slot);
            }
        }
        assert_eq!(held.len(), 8);
        assert_eq!(pool.in_use(), 8);

        held.clear();
        assert_eq!(pool.in_use(), 0);
    }
}
