//! dex Test Utilities
//!
//! Shared test infrastructure for the dex workspace:
//! - An in-memory upstream ([`MockCatalogApi`]) with call counters, gates,
//!   and failure injection
//! - Entry fixtures
//! - Proptest generators

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use proptest::prelude::*;
use tokio::sync::Notify;

// `dex_core::Strategy` is left out: it collides with proptest's `Strategy` trait.
pub use dex_core::{
    CatalogApi, CategoryRef, DexError, DexResult, Entry, EntryImages, EntryPage, EntryRef,
};

const LOCATOR_PREFIX: &str = "mock://entry/";

// ============================================================================
// FIXTURES
// ============================================================================

/// Build an entry with the given categories.
pub fn entry(id: u32, name: &str, categories: &[&str]) -> Entry {
    Entry::new(
        id,
        name,
        categories.iter().map(|c| c.to_string()).collect(),
    )
}

/// Locator the mock hands out for an entry id.
pub fn locator_for(id: u32) -> String {
    format!("{}{}", LOCATOR_PREFIX, id)
}

/// A small catalog spanning a few categories.
pub fn sample_catalog() -> Vec<Entry> {
    vec![
        entry(1, "bulbasaur", &["grass", "poison"]),
        entry(2, "ivysaur", &["grass", "poison"]),
        entry(3, "venusaur", &["grass", "poison"]),
        entry(4, "charmander", &["fire"]),
        entry(5, "charmeleon", &["fire"]),
        entry(6, "charizard", &["fire", "flying"]),
        entry(7, "squirtle", &["water"]),
        entry(8, "wartortle", &["water"]),
        entry(9, "blastoise", &["water"]),
        entry(25, "pikachu", &["electric"]),
        entry(37, "vulpix", &["fire"]),
        entry(58, "growlithe", &["fire"]),
    ]
}

// ============================================================================
// MOCK UPSTREAM
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GateKey {
    ListPage(usize),
    Category(String),
    Detail(String),
}

#[derive(Default)]
struct MockState {
    list_offsets: Vec<usize>,
    detail_calls: HashMap<String, usize>,
    category_calls: HashMap<String, usize>,
    directory_calls: usize,

    gates: HashMap<GateKey, Arc<Notify>>,
    detail_delays: HashMap<String, usize>,

    fail_category_once: HashSet<String>,
    fail_details: HashSet<String>,
    fail_list_offsets: HashSet<usize>,

    details_in_flight: usize,
    details_peak: usize,
}

/// In-memory [`CatalogApi`] for tests.
///
/// Entries are served in ascending id order. Every endpoint counts its
/// calls. A gate makes the next matching call wait until the returned
/// [`Notify`] is released; gates are one-shot.
pub struct MockCatalogApi {
    entries: Vec<Entry>,
    state: Mutex<MockState>,
}

impl MockCatalogApi {
    pub fn with_entries(mut entries: Vec<Entry>) -> Self {
        entries.sort_by_key(|e| e.id);
        Self {
            entries,
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn sample() -> Self {
        Self::with_entries(sample_catalog())
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    // ---- gates ------------------------------------------------------------

    fn hold(&self, key: GateKey) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().gates.insert(key, Arc::clone(&gate));
        gate
    }

    /// Hold the next list-page request at `offset`.
    pub fn hold_list_page(&self, offset: usize) -> Arc<Notify> {
        self.hold(GateKey::ListPage(offset))
    }

    /// Hold the next membership request for `category`.
    pub fn hold_category(&self, category: &str) -> Arc<Notify> {
        self.hold(GateKey::Category(category.to_lowercase()))
    }

    /// Hold the next detail request resolving to `name`.
    pub fn hold_detail(&self, name: &str) -> Arc<Notify> {
        self.hold(GateKey::Detail(name.to_lowercase()))
    }

    /// Make detail fetches for `name` yield `yields` times before completing.
    pub fn delay_detail(&self, name: &str, yields: usize) {
        self.lock().detail_delays.insert(name.to_lowercase(), yields);
    }

    async fn pass_gate(&self, key: GateKey) {
        let gate = self.lock().gates.remove(&key);
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    // ---- failure injection -----------------------------------------------

    pub fn fail_category_once(&self, category: &str) {
        self.lock().fail_category_once.insert(category.to_lowercase());
    }

    pub fn fail_detail(&self, name: &str) {
        self.lock().fail_details.insert(name.to_lowercase());
    }

    pub fn fail_list_page(&self, offset: usize) {
        self.lock().fail_list_offsets.insert(offset);
    }

    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.fail_category_once.clear();
        state.fail_details.clear();
        state.fail_list_offsets.clear();
    }

    // ---- counters --------------------------------------------------------

    pub fn list_offsets(&self) -> Vec<usize> {
        self.lock().list_offsets.clone()
    }

    pub fn detail_calls(&self, name: &str) -> usize {
        self.lock()
            .detail_calls
            .get(&name.to_lowercase())
            .copied()
            .unwrap_or(0)
    }

    pub fn total_detail_calls(&self) -> usize {
        self.lock().detail_calls.values().sum()
    }

    pub fn category_calls(&self, category: &str) -> usize {
        self.lock()
            .category_calls
            .get(&category.to_lowercase())
            .copied()
            .unwrap_or(0)
    }

    pub fn total_category_calls(&self) -> usize {
        self.lock().category_calls.values().sum()
    }

    pub fn directory_calls(&self) -> usize {
        self.lock().directory_calls
    }

    /// Highest number of detail fetches observed running at once.
    pub fn peak_detail_concurrency(&self) -> usize {
        self.lock().details_peak
    }

    pub fn reset_counters(&self) {
        let mut state = self.lock();
        state.list_offsets.clear();
        state.detail_calls.clear();
        state.category_calls.clear();
        state.directory_calls = 0;
        state.details_peak = 0;
    }

    // ---- lookups ---------------------------------------------------------

    fn find(&self, name_or_id: &str) -> Option<&Entry> {
        let key = name_or_id.trim().to_lowercase();
        match key.parse::<u32>() {
            Ok(id) => self.entries.iter().find(|e| e.id == id),
            Err(_) => self.entries.iter().find(|e| e.name == key),
        }
    }

    fn reference(entry: &Entry) -> EntryRef {
        EntryRef::new(entry.name.clone(), locator_for(entry.id))
    }

    async fn serve_detail(&self, key: &str, found: Option<&Entry>) -> DexResult<Entry> {
        let name = found.map(|e| e.name.clone()).unwrap_or_else(|| key.to_lowercase());
        let delay = {
            let mut state = self.lock();
            *state.detail_calls.entry(name.clone()).or_insert(0) += 1;
            state.details_in_flight += 1;
            state.details_peak = state.details_peak.max(state.details_in_flight);
            state.detail_delays.get(&name).copied().unwrap_or(0)
        };
        let _in_flight = InFlight { api: self };

        self.pass_gate(GateKey::Detail(name.clone())).await;
        // Always yield once so sibling fetches overlap.
        for _ in 0..=delay {
            tokio::task::yield_now().await;
        }

        if self.lock().fail_details.contains(&name) {
            return Err(DexError::transport(format!("injected detail failure for {}", name)));
        }
        found
            .cloned()
            .ok_or_else(|| DexError::not_found(format!("entry {}", key)))
    }
}

struct InFlight<'a> {
    api: &'a MockCatalogApi,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.api.lock();
        state.details_in_flight = state.details_in_flight.saturating_sub(1);
    }
}

#[async_trait]
impl CatalogApi for MockCatalogApi {
    async fn fetch_list_page(&self, limit: usize, offset: usize) -> DexResult<EntryPage> {
        let fail = {
            let mut state = self.lock();
            state.list_offsets.push(offset);
            state.fail_list_offsets.contains(&offset)
        };
        self.pass_gate(GateKey::ListPage(offset)).await;
        if fail {
            return Err(DexError::transport(format!("injected list failure at {}", offset)));
        }
        let results = self
            .entries
            .iter()
            .skip(offset)
            .take(limit)
            .map(Self::reference)
            .collect();
        Ok(EntryPage {
            results,
            total: Some(self.entries.len() as u64),
        })
    }

    async fn fetch_detail_by_locator(&self, locator: &str) -> DexResult<Entry> {
        let found = locator
            .strip_prefix(LOCATOR_PREFIX)
            .and_then(|id| id.parse::<u32>().ok())
            .and_then(|id| self.entries.iter().find(|e| e.id == id));
        self.serve_detail(locator, found).await
    }

    async fn fetch_detail_by_name(&self, name_or_id: &str) -> DexResult<Entry> {
        let found = self.find(name_or_id);
        self.serve_detail(name_or_id, found).await
    }

    async fn fetch_category_members(&self, category: &str) -> DexResult<Vec<EntryRef>> {
        let key = category.to_lowercase();
        let fail = {
            let mut state = self.lock();
            *state.category_calls.entry(key.clone()).or_insert(0) += 1;
            state.fail_category_once.remove(&key)
        };
        self.pass_gate(GateKey::Category(key.clone())).await;
        if fail {
            return Err(DexError::transport(format!("injected category failure for {}", key)));
        }
        let members: Vec<EntryRef> = self
            .entries
            .iter()
            .filter(|e| e.in_category(&key))
            .map(Self::reference)
            .collect();
        if members.is_empty() && !self.known_category(&key) {
            return Err(DexError::not_found(format!("category {}", key)));
        }
        Ok(members)
    }

    async fn fetch_categories(&self) -> DexResult<Vec<CategoryRef>> {
        self.lock().directory_calls += 1;
        let mut names: BTreeSet<String> = self
            .entries
            .iter()
            .flat_map(|e| e.categories.iter().cloned())
            .collect();
        names.insert("unknown".to_string());
        names.insert("shadow".to_string());
        Ok(names
            .into_iter()
            .map(|name| CategoryRef {
                locator: format!("mock://category/{}", name),
                name,
            })
            .collect())
    }
}

impl MockCatalogApi {
    fn known_category(&self, category: &str) -> bool {
        matches!(category, "unknown" | "shadow")
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

const CATEGORY_POOL: &[&str] = &["fire", "water", "grass", "electric", "psychic", "dragon"];

/// A single entry with a lowercase ascii name and one or two categories.
pub fn entry_strategy() -> impl Strategy<Value = Entry> {
    (
        1u32..2000,
        "[a-z]{3,10}",
        prop::sample::subsequence(CATEGORY_POOL, 1..=2),
    )
        .prop_map(|(id, name, categories)| entry(id, &name, &categories))
}

/// A catalog of `1..=max` entries with unique ids and unique names.
pub fn catalog_strategy(max: usize) -> impl Strategy<Value = Vec<Entry>> {
    prop::collection::vec(entry_strategy(), 1..=max.max(1)).prop_map(|entries| {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        entries
            .into_iter()
            .filter(|e| ids.insert(e.id) && names.insert(e.name.clone()))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_page_slices_by_offset() {
        let api = MockCatalogApi::sample();
        let page = api.fetch_list_page(2, 2).await.unwrap();
        let names: Vec<&str> = page.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["venusaur", "charmander"]);
        assert_eq!(page.total, Some(12));
        assert_eq!(api.list_offsets(), vec![2]);
    }

    #[tokio::test]
    async fn test_detail_by_name_and_id() {
        let api = MockCatalogApi::sample();
        assert_eq!(api.fetch_detail_by_name("25").await.unwrap().name, "pikachu");
        assert_eq!(api.fetch_detail_by_name("Pikachu").await.unwrap().id, 25);
        assert_eq!(api.detail_calls("pikachu"), 2);

        let missing = api.fetch_detail_by_name("doesnotexist").await.unwrap_err();
        assert!(missing.is_not_found());
    }

    #[tokio::test]
    async fn test_detail_by_locator() {
        let api = MockCatalogApi::sample();
        let entry = api.fetch_detail_by_locator(&locator_for(6)).await.unwrap();
        assert_eq!(entry.name, "charizard");
        assert_eq!(api.detail_calls("charizard"), 1);
    }

    #[tokio::test]
    async fn test_category_failure_is_one_shot() {
        let api = MockCatalogApi::sample();
        api.fail_category_once("fire");
        assert!(api.fetch_category_members("fire").await.is_err());
        let members = api.fetch_category_members("fire").await.unwrap();
        assert_eq!(members.len(), 5);
        assert_eq!(api.category_calls("fire"), 2);
    }

    #[tokio::test]
    async fn test_unknown_category_is_not_found() {
        let api = MockCatalogApi::sample();
        let err = api.fetch_category_members("cosmic").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_gate_holds_until_released() {
        let api = MockCatalogApi::sample();
        let gate = api.hold_list_page(0);
        let (page, ()) = tokio::join!(api.fetch_list_page(3, 0), async {
            tokio::task::yield_now().await;
            gate.notify_one();
        });
        assert_eq!(page.unwrap().results.len(), 3);
    }

    proptest! {
        #[test]
        fn catalog_strategy_yields_unique_keys(entries in catalog_strategy(20)) {
            let ids: HashSet<u32> = entries.iter().map(|e| e.id).collect();
            let names: HashSet<&str> = entries.iter().map(|e| e.name.as_str()).collect();
            prop_assert_eq!(ids.len(), entries.len());
            prop_assert_eq!(names.len(), entries.len());
            prop_assert!(entries.iter().all(|e| !e.categories.is_empty()));
        }
    }
}
