//! Lazily fetched, memoized category membership.
//!
//! Each category's member names are fetched at most once per session. The
//! index is an ordinary value passed to whoever needs it; one instance per
//! session gives the single-store semantics without any global state.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dex_core::{CatalogApi, CategoryRef, DexResult};
use tokio::sync::Mutex as AsyncMutex;

/// Pseudo-categories the upstream directory lists but no entry belongs to.
const HIDDEN_CATEGORIES: &[&str] = &["unknown", "shadow"];

type InFlightSlot = Arc<AsyncMutex<()>>;

#[derive(Default)]
struct IndexState {
    /// Bumped by `reset`; fetches started under an older epoch are discarded.
    epoch: u64,
    resolved: HashMap<String, Arc<BTreeSet<String>>>,
    in_flight: HashMap<String, InFlightSlot>,
    directory: Option<Arc<Vec<CategoryRef>>>,
}

/// Per-category member sets, fetched on demand and kept for the session.
pub struct MembershipIndex<A: ?Sized> {
    api: Arc<A>,
    state: Mutex<IndexState>,
    directory_slot: AsyncMutex<()>,
}

impl<A> MembershipIndex<A>
where
    A: CatalogApi + ?Sized,
{
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            state: Mutex::new(IndexState::default()),
            directory_slot: AsyncMutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, IndexState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make sure the member set for `category` is loaded.
    ///
    /// Returns immediately when the set is already resolved. Concurrent
    /// callers for the same category share one upstream fetch: later callers
    /// wait on the in-flight slot and then find the resolved set. A failed
    /// fetch leaves the category unresolved and the next `ensure` retries.
    pub async fn ensure(&self, category: &str) -> DexResult<()> {
        let key = normalize(category);
        if key.is_empty() {
            return Ok(());
        }

        let slot = {
            let mut state = self.lock();
            if state.resolved.contains_key(&key) {
                return Ok(());
            }
            Arc::clone(
                state
                    .in_flight
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };

        // Registered before queueing so a caller dropped while waiting still
        // releases its claim on the marker.
        let _release = InFlightRelease {
            index: self,
            key: &key,
            slot: &slot,
        };
        let _held = slot.lock().await;

        let epoch = {
            let state = self.lock();
            if state.resolved.contains_key(&key) {
                return Ok(());
            }
            state.epoch
        };

        tracing::debug!(category = %key, "fetching category membership");
        let members = self.api.fetch_category_members(&key).await?;
        let names: BTreeSet<String> = members
            .into_iter()
            .map(|m| m.name.to_lowercase())
            .collect();

        let mut state = self.lock();
        if state.epoch == epoch {
            tracing::debug!(category = %key, members = names.len(), "category membership resolved");
            state.resolved.insert(key.clone(), Arc::new(names));
        } else {
            tracing::debug!(category = %key, "discarding membership fetched before reset");
        }
        Ok(())
    }

    /// Member names of a resolved category, in ascending order.
    pub fn members(&self, category: &str) -> Option<Arc<BTreeSet<String>>> {
        self.lock().resolved.get(&normalize(category)).cloned()
    }

    /// Whether `name` is a known member of a resolved `category`.
    pub fn contains(&self, category: &str, name: &str) -> bool {
        self.members(category)
            .is_some_and(|set| set.contains(&name.to_lowercase()))
    }

    /// Whether a fetch for `category` is currently running or queued.
    pub fn is_pending(&self, category: &str) -> bool {
        self.lock().in_flight.contains_key(&normalize(category))
    }

    /// Fetch the category directory once, hiding pseudo-categories.
    pub async fn load_categories(&self) -> DexResult<Arc<Vec<CategoryRef>>> {
        if let Some(directory) = self.categories() {
            return Ok(directory);
        }

        let _held = self.directory_slot.lock().await;
        let epoch = {
            let state = self.lock();
            if let Some(directory) = &state.directory {
                return Ok(Arc::clone(directory));
            }
            state.epoch
        };

        let directory: Vec<CategoryRef> = self
            .api
            .fetch_categories()
            .await?
            .into_iter()
            .filter(|c| !HIDDEN_CATEGORIES.contains(&c.name.as_str()))
            .collect();
        let directory = Arc::new(directory);

        let mut state = self.lock();
        if state.epoch == epoch {
            state.directory = Some(Arc::clone(&directory));
        }
        Ok(directory)
    }

    /// The category directory, if it has been loaded.
    pub fn categories(&self) -> Option<Arc<Vec<CategoryRef>>> {
        self.lock().directory.clone()
    }

    /// Forget every resolved set, the directory, and all in-flight markers.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.epoch = state.epoch.wrapping_add(1);
        state.resolved.clear();
        state.in_flight.clear();
        state.directory = None;
    }
}

impl<A: ?Sized> std::fmt::Debug for MembershipIndex<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("MembershipIndex")
            .field("resolved", &state.resolved.len())
            .field("in_flight", &state.in_flight.len())
            .finish()
    }
}

/// Drops the in-flight marker on every exit path of `ensure`.
///
/// The marker is only removed when it is still ours and nobody else holds
/// it. Queued callers clean up after themselves, including ones dropped
/// before they reach the slot.
struct InFlightRelease<'a, A: CatalogApi + ?Sized> {
    index: &'a MembershipIndex<A>,
    key: &'a str,
    slot: &'a InFlightSlot,
}

impl<A: CatalogApi + ?Sized> Drop for InFlightRelease<'_, A> {
    fn drop(&mut self) {
        let mut state = self.index.lock();
        let ours = state
            .in_flight
            .get(self.key)
            .is_some_and(|current| Arc::ptr_eq(current, self.slot));
        // One reference in the map, one held by this caller.
        if ours && Arc::strong_count(self.slot) <= 2 {
            state.in_flight.remove(self.key);
        }
    }
}

fn normalize(category: &str) -> String {
    category.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_test_utils::{entry, MockCatalogApi};

    fn api() -> Arc<MockCatalogApi> {
        Arc::new(MockCatalogApi::with_entries(vec![
            entry(4, "charmander", &["fire"]),
            entry(37, "vulpix", &["fire"]),
            entry(7, "squirtle", &["water"]),
        ]))
    }

    #[tokio::test]
    async fn test_ensure_then_members() {
        let index = MembershipIndex::new(api());
        assert!(index.members("fire").is_none());

        index.ensure("fire").await.unwrap();
        let members = index.members("fire").unwrap();
        let names: Vec<&str> = members.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["charmander", "vulpix"]);
        assert!(index.contains("fire", "Vulpix"));
        assert!(!index.contains("fire", "squirtle"));
    }

    #[tokio::test]
    async fn test_ensure_is_memoized() {
        let api = api();
        let index = MembershipIndex::new(Arc::clone(&api));
        index.ensure("fire").await.unwrap();
        index.ensure("FIRE ").await.unwrap();
        assert_eq!(api.category_calls("fire"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_ensure_fetches_once() {
        let api = api();
        let gate = api.hold_category("fire");
        let index = MembershipIndex::new(Arc::clone(&api));

        let (a, b, ()) = tokio::join!(index.ensure("fire"), index.ensure("fire"), async {
            tokio::task::yield_now().await;
            gate.notify_one();
        });

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(api.category_calls("fire"), 1);
        assert!(index.members("fire").is_some());
        assert!(!index.is_pending("fire"));
    }

    #[tokio::test]
    async fn test_dropped_waiter_releases_marker() {
        let api = api();
        let gate = api.hold_category("fire");
        let index = MembershipIndex::new(Arc::clone(&api));

        let mut leader = Box::pin(index.ensure("fire"));
        let mut waiter = Box::pin(index.ensure("fire"));
        assert!(futures_util::poll!(&mut leader).is_pending());
        assert!(futures_util::poll!(&mut waiter).is_pending());
        assert!(index.is_pending("fire"));

        gate.notify_one();
        leader.await.unwrap();
        assert!(index.is_pending("fire"));

        drop(waiter);
        assert!(index.members("fire").is_some());
        assert!(!index.is_pending("fire"));
        assert_eq!(api.category_calls("fire"), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_retried() {
        let api = api();
        api.fail_category_once("fire");
        let index = MembershipIndex::new(Arc::clone(&api));

        assert!(index.ensure("fire").await.is_err());
        assert!(index.members("fire").is_none());
        assert!(!index.is_pending("fire"));

        index.ensure("fire").await.unwrap();
        assert_eq!(index.members("fire").unwrap().len(), 2);
        assert_eq!(api.category_calls("fire"), 2);
    }

    #[tokio::test]
    async fn test_empty_category_is_noop() {
        let api = api();
        let index = MembershipIndex::new(Arc::clone(&api));
        index.ensure("  ").await.unwrap();
        assert_eq!(api.total_category_calls(), 0);
    }

    #[tokio::test]
    async fn test_reset_forces_refetch() {
        let api = api();
        let index = MembershipIndex::new(Arc::clone(&api));
        index.ensure("water").await.unwrap();
        index.reset();
        assert!(index.members("water").is_none());

        index.ensure("water").await.unwrap();
        assert_eq!(api.category_calls("water"), 2);
    }

    #[tokio::test]
    async fn test_reset_discards_in_flight_result() {
        let api = api();
        let gate = api.hold_category("fire");
        let index = MembershipIndex::new(Arc::clone(&api));

        let (result, ()) = tokio::join!(index.ensure("fire"), async {
            tokio::task::yield_now().await;
            index.reset();
            gate.notify_one();
        });

        assert!(result.is_ok());
        assert!(index.members("fire").is_none());
    }

    #[tokio::test]
    async fn test_load_categories_hides_pseudo_categories() {
        let api = api();
        let index = MembershipIndex::new(Arc::clone(&api));

        let directory = index.load_categories().await.unwrap();
        let names: Vec<&str> = directory.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"fire"));
        assert!(!names.contains(&"unknown"));
        assert!(!names.contains(&"shadow"));

        index.load_categories().await.unwrap();
        assert_eq!(api.directory_calls(), 1);
    }
}
