//! Configuration for scrape runs
//!
//! `ScrapeConfig` holds the resolved values the collector, extractor and pool
//! read. It is built through a typestate builder or loaded from a JSON file.

pub mod builder;
pub mod getters;
pub mod types;

pub use builder::{ScrapeConfigBuilder, WithResultsDir};
pub use types::{LinkFormat, ScrapeConfig};
