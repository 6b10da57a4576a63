//! # Bounded, process-wide action cache.
//!
//! ```text
//!   insert(cache) ──► entries: HashMap<TaskId, Arc<ActionCache>>
//!                 └─► order:   VecDeque<TaskId>   (insertion order, FIFO)
//!
//!   len(entries) > max_entries ──► pop_front(order) ──► entries.remove(oldest)
//! ```
//!
//! ## Rules
//! - Only settled tasks are ever inserted, so the order index never holds
//!   in-flight ids.
//! - A task is cached at most once; a second insert is refused.
//! - `len() <= max_entries` after every insert; eviction drops the oldest
//!   surviving entry in O(1) amortized.
//! - Every table access goes through [`with_table`]: a broken table
//!   degrades to a skipped write, never to a panic in the caller.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::cache::ActionCache;
use crate::fabric::best_effort::with_table;
use crate::tasks::TaskId;

/// Why a cache write was skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheWriteError {
    /// The task already has a cached trace.
    #[error("task {0} is already cached")]
    AlreadyCached(TaskId),
    /// The table could not be accessed.
    #[error("action cache unavailable")]
    Unavailable,
}

#[derive(Default)]
struct CacheTable {
    entries: HashMap<TaskId, Arc<ActionCache>>,
    order: VecDeque<TaskId>,
}

/// Bounded store of per-task traces.
pub struct ActionCacheStore {
    table: Mutex<CacheTable>,
    max_entries: usize,
}

impl ActionCacheStore {
    /// Creates a store holding at most `max_entries` traces (min 1).
    pub fn new(max_entries: usize) -> Self {
        Self {
            table: Mutex::new(CacheTable::default()),
            max_entries: max_entries.max(1),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Stores a settled task's trace and returns the ids evicted to make room.
    pub fn insert(&self, cache: ActionCache) -> Result<Vec<TaskId>, CacheWriteError> {
        let max = self.max_entries;
        with_table(&self.table, "action_cache", move |t| {
            if t.entries.contains_key(&cache.task_id) {
                return Err(CacheWriteError::AlreadyCached(cache.task_id));
            }
            t.order.push_back(cache.task_id.clone());
            t.entries.insert(cache.task_id.clone(), Arc::new(cache));

            let mut evicted = Vec::new();
            while t.entries.len() > max {
                let Some(oldest) = t.order.pop_front() else {
                    break;
                };
                if t.entries.remove(&oldest).is_some() {
                    evicted.push(oldest);
                }
            }
            Ok(evicted)
        })
        .unwrap_or(Err(CacheWriteError::Unavailable))
    }

    /// The cached trace of a task.
    pub fn get(&self, task_id: &str) -> Option<Arc<ActionCache>> {
        with_table(&self.table, "action_cache", |t| t.entries.get(task_id).cloned()).flatten()
    }

    pub fn len(&self) -> usize {
        with_table(&self.table, "action_cache", |t| t.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached task ids, oldest first.
    pub fn ids(&self) -> Vec<TaskId> {
        with_table(&self.table, "action_cache", |t| {
            t.order
                .iter()
                .filter(|id| t.entries.contains_key(*id))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskStatus;
    use proptest::prelude::*;

    fn cache(id: &TaskId) -> ActionCache {
        ActionCache::new(id.clone(), TaskStatus::Completed, Vec::new())
    }

    #[test]
    fn second_insert_is_refused() {
        let store = ActionCacheStore::new(4);
        let id = TaskId::generate();
        store.insert(cache(&id)).unwrap();
        assert_eq!(
            store.insert(cache(&id)),
            Err(CacheWriteError::AlreadyCached(id.clone()))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn insert_past_bound_evicts_oldest() {
        let store = ActionCacheStore::new(2);
        let ids: Vec<TaskId> = (0..3).map(|_| TaskId::generate()).collect();
        store.insert(cache(&ids[0])).unwrap();
        store.insert(cache(&ids[1])).unwrap();
        let evicted = store.insert(cache(&ids[2])).unwrap();

        assert_eq!(evicted, vec![ids[0].clone()]);
        assert!(store.get(ids[0].as_str()).is_none());
        assert_eq!(store.ids(), vec![ids[1].clone(), ids[2].clone()]);
    }

    proptest! {
        #[test]
        fn size_never_exceeds_bound(max in 1usize..16, inserts in 0usize..64) {
            let store = ActionCacheStore::new(max);
            let mut ids = Vec::new();
            for _ in 0..inserts {
                let id = TaskId::generate();
                store.insert(cache(&id)).unwrap();
                ids.push(id);
                prop_assert!(store.len() <= max);
            }
            let kept = inserts.min(max);
            prop_assert_eq!(store.ids(), ids[inserts - kept..].to_vec());
        }
    }
}
