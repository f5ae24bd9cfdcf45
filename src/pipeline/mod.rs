//! Pipeline entry points for scraper operations.
//!
//! - `run_scrape` / `run_provider`: listing -> detail pages -> images -> catalog
//! - `run_backfill` / `backfill_provider`: catalog entries without image -> detail pages -> images
//! - `coverage::analyze`: catalog entries vs files on disk
//! - `cleanup`: provider canonicalization, duplicate report, key repair

pub mod circuit_breaker;
pub mod cleanup;
pub mod coverage;
pub mod retry;
pub mod run;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerResult};
pub use retry::RetryPolicy;
pub use run::{
    RunContext, RunSummary, backfill_provider, run_backfill, run_provider, run_scrape,
};
