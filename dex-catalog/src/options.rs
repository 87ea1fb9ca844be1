//! Tunables for the catalog controller.

use dex_core::{DexError, DexResult};

pub const DEFAULT_PAGE_SIZE: usize = 24;
pub const DEFAULT_CONCURRENCY: usize = 6;

/// Configuration for a [`CatalogController`](crate::CatalogController).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogOptions {
    /// Entries requested per page, for both browse-all and category paging.
    pub page_size: usize,
    /// Maximum concurrent detail fetches for a category page.
    pub concurrency: usize,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl CatalogOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn validate(&self) -> DexResult<()> {
        if self.page_size == 0 {
            return Err(DexError::Config {
                field: "page_size",
                reason: "must be > 0".to_string(),
            });
        }
        if self.concurrency == 0 {
            return Err(DexError::Config {
                field: "concurrency",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }
}
