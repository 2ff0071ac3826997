//! Bounded in-memory cache of finished analysis results
//!
//! Keyed by [`rhyme_common::fingerprint`]. When full, the entry inserted
//! earliest is evicted; reads do not refresh an entry's position. Entries have
//! no time-based expiry.
//!
//! **Lock discipline:** one mutex guards the map and the insertion queue. It
//! is held only inside a single `get`/`set`/`len`/`clear` call and never
//! across an `.await`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::AnalysisResult;

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, Arc<AnalysisResult>>,
    /// Fingerprints in insertion order (oldest first)
    order: VecDeque<String>,
}

/// Insertion-order bounded result cache
#[derive(Debug)]
pub struct ResultCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` results (0 disables storage)
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Every critical section leaves the state consistent, so a poisoned
        // lock is still safe to use
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, fingerprint: &str) -> Option<Arc<AnalysisResult>> {
        self.lock().entries.get(fingerprint).cloned()
    }

    /// Store `result` under `fingerprint`
    ///
    /// Replacing an existing key keeps its original insertion position. A new
    /// key at capacity evicts the oldest inserted entry first.
    pub fn set(&self, fingerprint: String, result: Arc<AnalysisResult>) {
        if self.capacity == 0 {
            return;
        }

        let mut state = self.lock();
        if let Some(existing) = state.entries.get_mut(&fingerprint) {
            *existing = result;
            return;
        }

        while state.entries.len() >= self.capacity {
            match state.order.pop_front() {
                Some(oldest) => {
                    state.entries.remove(&oldest);
                    tracing::debug!(fingerprint = %oldest, "Evicted cached result");
                }
                None => break,
            }
        }

        state.order.push_back(fingerprint.clone());
        state.entries.insert(fingerprint, result);
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
    }
}
