// src/models/mod.rs

//! Domain models for the catalog scraper.

mod catalog;
mod config;
mod provider;
mod rules;

// Re-export all public types
pub use catalog::{
    Catalog, CatalogEntry, IMAGE_EXTENSIONS, KeyChange, MergeOutcome, MergePolicy, game_slug_of,
    split_key,
};
pub use config::{
    CircuitBreakerConfig, Config, CrawlerConfig, ImageConfig, PathsConfig, RetryConfig,
    SourceConfig,
};
pub use provider::Provider;
pub use rules::ImageRule;
