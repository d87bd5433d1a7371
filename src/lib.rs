//! # publist
//!
//! Exports one author's Google Scholar publication list as the JSON file a
//! static website renders.
//!
//! ## Modules
//!
//! - [`source`] - Source interface, raw record types, snapshot replay
//! - [`scholar`] - Google Scholar profile scraping
//! - [`resolver`] - Author lookup by ID with name/affiliation fallback
//! - [`retry`] - Bounded exponential backoff
//! - [`normalize`] - Raw record to canonical record
//! - [`publication`] - Deduplication, ordering and selection
//! - [`pipeline`] - Per-record detail fetching with failure isolation
//! - [`report`] - Output files, validation and run metadata
//! - [`run`] - The full update
//! - [`config`] - Proxy and output settings
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use publist::config::{ProxyConfig, RunConfig};
//! use publist::pipeline::HarvestOptions;
//! use publist::resolver::AuthorQuery;
//! use publist::retry::RetryPolicy;
//! use publist::scholar::ScholarSource;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = ScholarSource::new(&ProxyConfig::None, None)?;
//!     let query = AuthorQuery {
//!         id: Some("RZAgZ88AAAAJ".to_string()),
//!         ..Default::default()
//!     };
//!     let summary = publist::run::update(
//!         &source,
//!         &query,
//!         RetryPolicy::default(),
//!         &HarvestOptions::default(),
//!         &RunConfig::default(),
//!     )
//!     .await?;
//!     println!("Wrote {} publications", summary.metadata.written_count);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod publication;
pub mod report;
pub mod resolver;
pub mod retry;
pub mod run;
pub mod scholar;
pub mod source;

pub use error::{PublistError, Result};
