//! REST transport for the dex catalog.
//!
//! [`RestClient`] implements [`dex_core::CatalogApi`] against a PokeAPI-shaped
//! upstream. Wire formats stay private to this crate; callers only ever see
//! `dex-core` types.

pub mod config;
pub mod error;
pub mod rest;
mod wire;

pub use config::ClientConfig;
pub use error::ClientError;
pub use rest::RestClient;
