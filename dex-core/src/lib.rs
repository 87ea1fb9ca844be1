//! dex core
//!
//! Data model, error taxonomy, and the upstream collaborator trait shared by
//! every crate in the workspace. Nothing in here performs I/O.

pub mod api;
pub mod entry;
pub mod error;

pub use api::CatalogApi;
pub use entry::{CategoryRef, Entry, EntryImages, EntryPage, EntryRef, Strategy};
pub use error::{DexError, DexResult};
