//! dex catalog
//!
//! The request-orchestration core behind a scrollable, filterable catalog.
//! [`CatalogController`] unifies three paging strategies (browse-all,
//! by-category, exact lookup) behind one interface, shares a [`DetailCache`]
//! across them, bounds category fan-out with a [`ConcurrencyLimiter`], and
//! drops results from superseded requests using a generation token.

pub mod cache;
pub mod controller;
pub mod limiter;
pub mod membership;
pub mod options;

pub use cache::DetailCache;
pub use controller::{CatalogController, CatalogSnapshot, FailureKind, LoadFailure};
pub use limiter::ConcurrencyLimiter;
pub use membership::MembershipIndex;
pub use options::CatalogOptions;
