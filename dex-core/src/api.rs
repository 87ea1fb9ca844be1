//! Upstream collaborator trait.
//!
//! The catalog core never talks HTTP directly. Everything it needs from the
//! upstream REST API goes through [`CatalogApi`], which lets the transport be
//! swapped for an in-memory mock in tests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::entry::{CategoryRef, Entry, EntryPage, EntryRef};
use crate::error::DexResult;

/// Read-only access to the upstream creature catalog.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch one page of entry references starting at `offset`.
    async fn fetch_list_page(&self, limit: usize, offset: usize) -> DexResult<EntryPage>;

    /// Resolve a reference's locator into a full entry.
    async fn fetch_detail_by_locator(&self, locator: &str) -> DexResult<Entry>;

    /// Fetch an entry by exact name or numeric id.
    ///
    /// Fails with [`DexError::NotFound`](crate::DexError::NotFound) when
    /// nothing matches.
    async fn fetch_detail_by_name(&self, name_or_id: &str) -> DexResult<Entry>;

    /// Fetch every member of `category`.
    async fn fetch_category_members(&self, category: &str) -> DexResult<Vec<EntryRef>>;

    /// Fetch the category directory.
    async fn fetch_categories(&self) -> DexResult<Vec<CategoryRef>>;
}

#[async_trait]
impl<T: CatalogApi + ?Sized> CatalogApi for Arc<T> {
    async fn fetch_list_page(&self, limit: usize, offset: usize) -> DexResult<EntryPage> {
        (**self).fetch_list_page(limit, offset).await
    }

    async fn fetch_detail_by_locator(&self, locator: &str) -> DexResult<Entry> {
        (**self).fetch_detail_by_locator(locator).await
    }

    async fn fetch_detail_by_name(&self, name_or_id: &str) -> DexResult<Entry> {
        (**self).fetch_detail_by_name(name_or_id).await
    }

    async fn fetch_category_members(&self, category: &str) -> DexResult<Vec<EntryRef>> {
        (**self).fetch_category_members(category).await
    }

    async fn fetch_categories(&self) -> DexResult<Vec<CategoryRef>> {
        (**self).fetch_categories().await
    }
}
