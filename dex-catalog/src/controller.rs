//! Catalog controller: filter state, paging cursors, and staleness control.
//!
//! Every filter change or page request mints a new [`Generation`]. Async
//! work captures the generation that authorized it and re-checks it under
//! the state lock before touching flags, the entry list, or a cursor. A
//! mismatch means a newer operation has taken over, and the work's results
//! are dropped without any visible effect. The underlying HTTP calls are
//! not aborted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dex_core::{CatalogApi, DexError, DexResult, Entry, EntryRef, Strategy};
use futures_util::stream::{FuturesUnordered, TryStreamExt};

use crate::cache::DetailCache;
use crate::limiter::ConcurrencyLimiter;
use crate::membership::MembershipIndex;
use crate::options::CatalogOptions;

/// Classification of a normalized load failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    Transport,
}

impl From<&DexError> for FailureKind {
    fn from(err: &DexError) -> Self {
        if err.is_not_found() {
            FailureKind::NotFound
        } else {
            FailureKind::Transport
        }
    }
}

/// A failure surfaced to the user, reduced to strategy and kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadFailure {
    pub strategy: Strategy,
    pub kind: FailureKind,
}

impl LoadFailure {
    fn new(strategy: Strategy, err: &DexError) -> Self {
        Self {
            strategy,
            kind: FailureKind::from(err),
        }
    }

    /// Short user-facing message for this failure.
    pub fn message(&self) -> &'static str {
        match self.strategy {
            Strategy::All => "Failed to load catalog.",
            Strategy::Category => "Failed to load by category.",
            Strategy::Exact => "No entry found with that exact name or id.",
        }
    }
}

impl std::fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Point-in-time copy of the observable controller state.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSnapshot {
    pub strategy: Strategy,
    pub entries: Vec<Arc<Entry>>,
    pub loading: bool,
    pub loading_more: bool,
    pub error: Option<LoadFailure>,
    pub can_load_more: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Generation(u64);

#[derive(Debug, Default)]
struct ControllerState {
    query: String,
    category: String,
    strategy: Strategy,
    entries: Vec<Arc<Entry>>,
    loading: bool,
    loading_more: bool,
    error: Option<LoadFailure>,

    offset: usize,
    browse_exhausted: bool,
    category_names: Vec<String>,
    category_cursor: usize,

    minted: u64,
    /// `None` after a reset; no outstanding generation matches it.
    current: Option<Generation>,
}

impl ControllerState {
    fn mint(&mut self) -> Generation {
        self.minted += 1;
        let generation = Generation(self.minted);
        self.current = Some(generation);
        generation
    }

    fn is_current(&self, generation: Generation) -> bool {
        self.current == Some(generation)
    }

    /// Start a first-page operation: new generation, cleared list and cursors.
    fn begin_fresh(&mut self, strategy: Strategy) -> Generation {
        let generation = self.mint();
        self.strategy = strategy;
        self.entries.clear();
        self.error = None;
        self.loading = true;
        self.loading_more = false;
        self.offset = 0;
        self.browse_exhausted = false;
        self.category_names.clear();
        self.category_cursor = 0;
        generation
    }

    fn can_load_more(&self) -> bool {
        match self.strategy {
            Strategy::All => !self.browse_exhausted,
            Strategy::Category => self.category_cursor < self.category_names.len(),
            Strategy::Exact => false,
        }
    }

    fn finish(&mut self) {
        self.loading = false;
        self.loading_more = false;
    }
}

/// Stateful front for the three paging strategies.
///
/// All operations take `&self`; several may be in flight at once and only
/// the most recently started one is allowed to change what callers observe.
pub struct CatalogController<A: ?Sized> {
    api: Arc<A>,
    index: Arc<MembershipIndex<A>>,
    cache: DetailCache,
    limiter: ConcurrencyLimiter,
    options: CatalogOptions,
    state: Mutex<ControllerState>,
}

impl<A> CatalogController<A>
where
    A: CatalogApi + ?Sized,
{
    pub fn new(
        api: Arc<A>,
        index: Arc<MembershipIndex<A>>,
        options: CatalogOptions,
    ) -> DexResult<Self> {
        options.validate()?;
        Ok(Self::build(api, index, options))
    }

    /// Controller with default options and its own membership index.
    pub fn with_defaults(api: Arc<A>) -> Self {
        let index = Arc::new(MembershipIndex::new(Arc::clone(&api)));
        Self::build(api, index, CatalogOptions::default())
    }

    fn build(api: Arc<A>, index: Arc<MembershipIndex<A>>, options: CatalogOptions) -> Self {
        Self {
            api,
            index,
            cache: DetailCache::new(),
            limiter: ConcurrencyLimiter::new(options.concurrency),
            options,
            state: Mutex::new(ControllerState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn options(&self) -> &CatalogOptions {
        &self.options
    }

    pub fn index(&self) -> &Arc<MembershipIndex<A>> {
        &self.index
    }

    pub fn cache(&self) -> &DetailCache {
        &self.cache
    }

    pub fn set_query(&self, query: impl Into<String>) {
        self.lock().query = query.into();
    }

    pub fn set_category(&self, category: impl Into<String>) {
        self.lock().category = category.into();
    }

    pub fn query(&self) -> String {
        self.lock().query.clone()
    }

    pub fn category(&self) -> String {
        self.lock().category.clone()
    }

    pub fn strategy(&self) -> Strategy {
        self.lock().strategy
    }

    pub fn entries(&self) -> Vec<Arc<Entry>> {
        self.lock().entries.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn is_loading_more(&self) -> bool {
        self.lock().loading_more
    }

    pub fn error(&self) -> Option<LoadFailure> {
        self.lock().error
    }

    pub fn can_load_more(&self) -> bool {
        self.lock().can_load_more()
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        let state = self.lock();
        CatalogSnapshot {
            strategy: state.strategy,
            entries: state.entries.clone(),
            loading: state.loading,
            loading_more: state.loading_more,
            error: state.error,
            can_load_more: state.can_load_more(),
        }
    }

    /// Re-run the catalog for the current filters.
    ///
    /// Exact query text wins over a category, which wins over browse-all.
    pub async fn apply_filters(&self) {
        let (query, category) = {
            let state = self.lock();
            (
                state.query.trim().to_string(),
                state.category.trim().to_string(),
            )
        };

        if !query.is_empty() {
            self.load_exact(&query).await;
        } else if !category.is_empty() {
            self.load_category_first(&category).await;
        } else {
            self.load_browse(None).await;
        }
    }

    /// Append the next page for the active strategy. No-op for exact lookups
    /// and once the active strategy has nothing left.
    pub async fn load_more(&self) {
        let strategy = self.lock().strategy;
        match strategy {
            Strategy::All => self.load_browse_next().await,
            Strategy::Category => self.load_category_next().await,
            Strategy::Exact => {}
        }
    }

    /// Drop all state, the detail cache, and the membership index, and
    /// invalidate every in-flight operation.
    pub fn reset(&self) {
        {
            let mut state = self.lock();
            let minted = state.minted;
            *state = ControllerState {
                minted,
                ..ControllerState::default()
            };
        }
        self.cache.reset();
        self.index.reset();
        tracing::debug!("catalog controller reset");
    }

    async fn load_browse_next(&self) {
        let generation = {
            let mut state = self.lock();
            if state.strategy != Strategy::All || state.browse_exhausted {
                return;
            }
            let generation = state.mint();
            state.loading_more = true;
            generation
        };
        self.load_browse(Some(generation)).await;
    }

    /// Browse-all page. `continuation` carries the generation minted by
    /// `load_more`; `None` starts a fresh query.
    async fn load_browse(&self, continuation: Option<Generation>) {
        let (generation, offset) = {
            let mut state = self.lock();
            let generation = match continuation {
                Some(generation) => generation,
                None => state.begin_fresh(Strategy::All),
            };
            (generation, state.offset)
        };

        let result = self.fetch_browse_page(generation, offset).await;

        let mut state = self.lock();
        if !state.is_current(generation) {
            tracing::debug!(strategy = "all", offset, "superseded; discarding page");
            return;
        }
        match result {
            Ok((mut page, total)) => {
                page.sort_by_key(|e| e.id);
                if page.is_empty() {
                    state.browse_exhausted = true;
                }
                tracing::debug!(strategy = "all", offset, count = page.len(), "appending page");
                state.entries.extend(page);
                state.offset = offset + self.options.page_size;
                if total.is_some_and(|total| state.offset as u64 >= total) {
                    state.browse_exhausted = true;
                }
            }
            Err(err) => {
                tracing::warn!(strategy = "all", offset, error = %err, "browse page failed");
                state.error = Some(LoadFailure::new(Strategy::All, &err));
            }
        }
        state.finish();
    }

    async fn fetch_browse_page(
        &self,
        generation: Generation,
        offset: usize,
    ) -> DexResult<(Vec<Arc<Entry>>, Option<u64>)> {
        let page = self
            .api
            .fetch_list_page(self.options.page_size, offset)
            .await?;
        if !self.lock().is_current(generation) {
            return Ok((Vec::new(), page.total));
        }

        // Browse pages are small and fixed-size, so the fan-out is not limited.
        let epoch = self.cache.epoch();
        let pending: FuturesUnordered<_> = page
            .results
            .iter()
            .map(|reference| self.resolve_reference(epoch, reference))
            .collect();
        let resolved = pending.try_collect::<Vec<_>>().await?;
        Ok((resolved, page.total))
    }

    async fn load_category_first(&self, category: &str) {
        let generation = self.lock().begin_fresh(Strategy::Category);

        let ensured = self.index.ensure(category).await;
        {
            let mut state = self.lock();
            if !state.is_current(generation) {
                tracing::debug!(strategy = "category", category, "superseded; discarding membership");
                return;
            }
            if let Err(err) = ensured {
                tracing::warn!(strategy = "category", category, error = %err, "category membership failed");
                state.error = Some(LoadFailure::new(Strategy::Category, &err));
                state.finish();
                return;
            }
            // BTreeSet iteration is already ascending.
            state.category_names = self
                .index
                .members(category)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default();
            state.category_cursor = 0;
        }

        self.load_category_page(generation).await;

        let mut state = self.lock();
        if state.is_current(generation) {
            state.finish();
        }
    }

    async fn load_category_next(&self) {
        let generation = {
            let mut state = self.lock();
            if state.strategy != Strategy::Category
                || state.category_cursor >= state.category_names.len()
            {
                return;
            }
            let generation = state.mint();
            state.loading_more = true;
            generation
        };
        self.load_category_page(generation).await;
    }

    async fn load_category_page(&self, generation: Generation) {
        let (start, slice) = {
            let state = self.lock();
            if !state.is_current(generation) {
                return;
            }
            let start = state.category_cursor;
            let end = (start + self.options.page_size).min(state.category_names.len());
            if start >= end {
                return;
            }
            (start, state.category_names[start..end].to_vec())
        };

        let epoch = self.cache.epoch();
        let pending: FuturesUnordered<_> = slice
            .iter()
            .map(|name| self.limiter.submit(move || self.resolve_name(epoch, name)))
            .collect();
        let result = pending.try_collect::<Vec<_>>().await;

        let mut state = self.lock();
        if !state.is_current(generation) {
            tracing::debug!(strategy = "category", start, "superseded; discarding page");
            return;
        }
        match result {
            Ok(mut page) => {
                page.sort_by_key(|e| e.id);
                tracing::debug!(strategy = "category", start, count = page.len(), "appending page");
                state.entries.extend(page);
                state.category_cursor = start + slice.len();
            }
            Err(err) => {
                tracing::warn!(strategy = "category", start, error = %err, "category page failed");
                state.error = Some(LoadFailure::new(Strategy::Category, &err));
            }
        }
        state.finish();
    }

    async fn load_exact(&self, query: &str) {
        let generation = self.lock().begin_fresh(Strategy::Exact);
        let key = query.to_lowercase();

        let result = match self.cache.get_by_query(&key) {
            Some(hit) => Ok(hit),
            None => {
                let epoch = self.cache.epoch();
                self.api.fetch_detail_by_name(&key).await.map(|entry| {
                    let name = entry.name.clone();
                    self.cache.insert(epoch, &name, entry)
                })
            }
        };

        let mut state = self.lock();
        if !state.is_current(generation) {
            tracing::debug!(strategy = "exact", query = %key, "superseded; discarding lookup");
            return;
        }
        match result {
            Ok(entry) => state.entries = vec![entry],
            Err(err) => {
                tracing::warn!(strategy = "exact", query = %key, error = %err, "exact lookup failed");
                state.entries.clear();
                state.error = Some(LoadFailure::new(Strategy::Exact, &err));
            }
        }
        state.finish();
    }

    async fn resolve_reference(&self, epoch: u64, reference: &EntryRef) -> DexResult<Arc<Entry>> {
        if let Some(hit) = self.cache.get_by_name(&reference.name) {
            return Ok(hit);
        }
        let entry = self.api.fetch_detail_by_locator(&reference.locator).await?;
        Ok(self.cache.insert(epoch, &reference.name, entry))
    }

    async fn resolve_name(&self, epoch: u64, name: &str) -> DexResult<Arc<Entry>> {
        if let Some(hit) = self.cache.get_by_name(name) {
            return Ok(hit);
        }
        let entry = self.api.fetch_detail_by_name(name).await?;
        Ok(self.cache.insert(epoch, name, entry))
    }
}

impl<A: ?Sized> std::fmt::Debug for CatalogController<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("CatalogController")
            .field("strategy", &state.strategy)
            .field("entries", &state.entries.len())
            .field("loading", &state.loading)
            .field("loading_more", &state.loading_more)
            .field("options", &self.options)
            .finish()
    }
}
