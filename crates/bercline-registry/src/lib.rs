//! Registry paginator stream: sweep application numbers per county.
//!
//! For every county, application numbers are probed in sequence through a
//! two-request chain (publicity situations → articles) until a long run of
//! empty numbers declares the county's key-space exhausted. Articles land
//! in one JSON table per county, flushed incrementally.

pub mod api;
pub mod config;
pub mod county;
pub mod extract;
pub mod prober;
pub mod runner;
pub mod table;

pub use api::{Article, RegistryApi};
pub use config::RegistryConfig;
pub use county::{load_counties, County};
pub use extract::ArticleExtractor;
pub use prober::ArticleProber;
pub use runner::{run, RegistrySummary};
pub use table::JsonTable;
