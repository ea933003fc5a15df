use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::PromptId;

/// Per-id async locks so writes to the same prompt run one at a time.
///
/// Entries are created on first use and dropped again once nobody holds
/// or waits on them.
#[derive(Default)]
pub struct IdLocks {
    locks: Mutex<HashMap<PromptId, Arc<AsyncMutex<()>>>>,
}

pub struct IdGuard<'a> {
    registry: &'a IdLocks,
    id: PromptId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl IdLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, id: PromptId) -> IdGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Waiters cancelled after the holder let go leave entries only the map owns.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(id).or_default().clone()
        };
        let guard = lock.lock_owned().await;
        IdGuard {
            registry: self,
            id,
            guard: Some(guard),
        }
    }

    /// Number of ids with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for IdGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self
            .registry
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Only the map's own handle left: no holder, no waiter.
        if locks
            .get(&self.id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn entry_removed_after_release() {
        let locks = IdLocks::new();
        {
            let _guard = locks.acquire(1).await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn different_ids_do_not_block() {
        let locks = IdLocks::new();
        let _a = locks.acquire(1).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(2)).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn same_id_waits_for_release() {
        let locks = Arc::new(IdLocks::new());
        let first = locks.acquire(7).await;

        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.acquire(7)).await;
        assert!(blocked.is_err());

        drop(first);
        let second = tokio::time::timeout(Duration::from_millis(100), locks.acquire(7)).await;
        assert!(second.is_ok());
        drop(second);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn cancelled_waiter_entry_pruned_on_next_acquire() {
        let locks = IdLocks::new();
        let holder = locks.acquire(9).await;

        let mut waiter = Box::pin(locks.acquire(9));
        assert!(futures::poll!(&mut waiter).is_pending());
        drop(holder);
        drop(waiter);
        // Nobody holds or waits on 9, but the entry is still there.
        assert_eq!(locks.len(), 1);

        let other = locks.acquire(10).await;
        assert_eq!(locks.len(), 1);
        drop(other);
        assert!(locks.is_empty());
    }
}
