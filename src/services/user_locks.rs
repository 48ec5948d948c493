//! Per-user mutual exclusion for provisioning.
//!
//! Different users never contend; entries are dropped once the last holder
//! or waiter for a user is gone.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Default)]
pub struct UserLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access for `user_id`.
    pub async fn acquire(&self, user_id: Uuid) -> UserLockGuard<'_> {
        // Clone out of the map before awaiting so no shard lock is held
        let lock = self.locks.entry(user_id).or_default().clone();
        let guard = lock.lock_owned().await;

        UserLockGuard {
            locks: self,
            user_id,
            guard: Some(guard),
        }
    }

    /// Number of users with a live lock entry
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Held for the duration of one user's provisioning.
pub struct UserLockGuard<'a> {
    locks: &'a UserLocks,
    user_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own reference left: nobody holds or waits
        self.locks
            .locks
            .remove_if(&self.user_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
