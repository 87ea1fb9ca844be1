//! Session-scoped cache of resolved entries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dex_core::Entry;

#[derive(Default)]
struct CacheState {
    epoch: u64,
    by_name: HashMap<String, Arc<Entry>>,
    name_by_id: HashMap<u32, String>,
}

/// Lowercase name → resolved [`Entry`], shared by every paging strategy.
///
/// Append-only until [`reset`](DetailCache::reset). The first entry stored
/// under a name wins and is handed out for every later request.
#[derive(Default)]
pub struct DetailCache {
    state: Mutex<CacheState>,
}

impl DetailCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current epoch. Capture it before fetching and pass it to [`insert`](Self::insert).
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<Entry>> {
        self.lock().by_name.get(&name.to_lowercase()).cloned()
    }

    /// Look up by exact name, or by numeric id when `query` is all digits.
    pub fn get_by_query(&self, query: &str) -> Option<Arc<Entry>> {
        let key = query.trim().to_lowercase();
        let state = self.lock();
        if let Some(entry) = state.by_name.get(&key) {
            return Some(Arc::clone(entry));
        }
        let id = key.parse::<u32>().ok()?;
        let name = state.name_by_id.get(&id)?;
        state.by_name.get(name).cloned()
    }

    /// Store `entry` under `name`, returning whichever entry the cache now holds.
    ///
    /// Inserts from an older epoch (a fetch that began before a reset) are
    /// returned to the caller but not stored.
    pub fn insert(&self, epoch: u64, name: &str, entry: Entry) -> Arc<Entry> {
        let key = name.to_lowercase();
        let mut state = self.lock();
        if state.epoch != epoch {
            return Arc::new(entry);
        }
        if let Some(existing) = state.by_name.get(&key) {
            return Arc::clone(existing);
        }
        let entry = Arc::new(entry);
        state.name_by_id.entry(entry.id).or_insert_with(|| key.clone());
        state.by_name.insert(key, Arc::clone(&entry));
        entry
    }

    pub fn len(&self) -> usize {
        self.lock().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reset(&self) {
        let mut state = self.lock();
        state.epoch = state.epoch.wrapping_add(1);
        state.by_name.clear();
        state.name_by_id.clear();
    }
}

impl std::fmt::Debug for DetailCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetailCache")
            .field("entries", &self.len())
            .finish()
    }
}
