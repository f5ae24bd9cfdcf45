//! Service layer for the scraper.
//!
//! - Page retrieval (`PageSource`, `HttpSource`)
//! - Listing enumeration (`ListingParser`)
//! - Thumbnail discovery (`ImageLocator`)
//! - Image download and normalization (`ImageFetcher`)

mod images;
mod listing;
mod locator;
mod source;

pub use images::{ImageFetcher, StoreOutcome, StoredImage};
pub use listing::{GameLink, ListingParser};
pub use locator::ImageLocator;
pub use source::{HttpSource, PageSource};
