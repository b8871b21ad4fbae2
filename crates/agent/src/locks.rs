//! Per-thread turn serialisation

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per thread id. Turns on the same thread queue up,
/// different threads never wait on each other.
#[derive(Default)]
pub struct ThreadLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ThreadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `thread_id`
    pub async fn lock(&self, thread_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(thread_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Forget `thread_id`'s lock once nobody holds or waits on it.
    /// Call after dropping the guard.
    pub async fn release(&self, thread_id: &str) {
        let mut locks = self.locks.lock().await;
        if locks
            .get(thread_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(thread_id);
        }
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}
