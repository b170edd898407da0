//! Lock manager: per-owner, per-study, and per-(study, lock-class) mutexes
//! created on demand (spec.md §4.1).
//!
//! Grounded in the teacher's `DashMap<AgentId, ...>` fields on
//! `scheduler::DefaultAgentScheduler` / `resource::DefaultResourceManager`:
//! a concurrent map keyed by resource name, entries created lazily and
//! never removed (bounded by the number of live owners/studies, per
//! spec.md §9). Locks are `tokio::sync::Mutex` rather than `parking_lot`
//! because the operation lock must be held across an `.await` (the Policy
//! RPC) without blocking the executor thread.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// The three lock namespaces from spec.md §4.1. Acquisition across
/// namespaces always follows owner -> study -> operation; no handler takes
/// two locks of the same class.
#[derive(Default)]
pub struct LockManager {
    owner_locks: DashMap<String, Arc<Mutex<()>>>,
    study_locks: DashMap<String, Arc<Mutex<()>>>,
    operation_locks: DashMap<String, Arc<Mutex<()>>>,
}

fn entry_for(map: &DashMap<String, Arc<Mutex<()>>>, key: &str) -> Arc<Mutex<()>> {
    map.entry(key.to_string())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the owner lock for `owner_name`, guarding study-list
    /// mutation (creation collision check).
    pub async fn lock_owner(&self, owner_name: &str) -> OwnedMutexGuard<()> {
        entry_for(&self.owner_locks, owner_name).lock_owned().await
    }

    /// Acquires the study lock for `study_name`, guarding trial
    /// creation/update within a study.
    pub async fn lock_study(&self, study_name: &str) -> OwnedMutexGuard<()> {
        entry_for(&self.study_locks, study_name).lock_owned().await
    }

    /// Acquires the operation lock for `study_name`, serializing
    /// `SuggestTrials` and `CheckTrialEarlyStoppingState` for that study.
    pub async fn lock_operation(&self, study_name: &str) -> OwnedMutexGuard<()> {
        entry_for(&self.operation_locks, study_name).lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn same_key_serializes_access() {
        let locks = Arc::new(LockManager::new());
        let counter = Arc::new(AtomicU32::new(0));
        let mut handles = Vec::new();

        for _ in 0..20 {
            let locks = locks.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock_study("owners/a/studies/s1").await;
                let before = counter.fetch_add(1, Ordering::SeqCst);
                // If two tasks were in the critical section concurrently,
                // interleaved increments would still total correctly, so
                // assert on a stronger witness: no other task can observe
                // `before + 1` missing from the final count sequence.
                tokio::task::yield_now().await;
                assert_eq!(counter.load(Ordering::SeqCst), before + 1);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_block_each_other() {
        let locks = LockManager::new();
        let _a = locks.lock_study("owners/a/studies/s1").await;
        // A distinct key must be immediately acquirable even while the
        // first guard is held.
        let _b = locks.lock_study("owners/a/studies/s2").await;
    }
}
