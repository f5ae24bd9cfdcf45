//! Application configuration structures.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{ImageRule, Provider};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Retry policy for transient fetch failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Run abort threshold
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,

    /// Catalog and image locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Image normalization settings
    #[serde(default)]
    pub image: ImageConfig,

    /// Provider listings to scrape
    #[serde(default = "defaults::sources")]
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::validation("retry.max_attempts must be > 0"));
        }
        if self.retry.multiplier < 1.0 {
            return Err(AppError::validation("retry.multiplier must be >= 1.0"));
        }
        if self.circuit_breaker.max_consecutive_failures == 0 {
            return Err(AppError::validation(
                "circuit_breaker.max_consecutive_failures must be > 0",
            ));
        }
        if !(1..=100).contains(&self.image.jpeg_quality) {
            return Err(AppError::validation("image.jpeg_quality must be in 1..=100"));
        }
        if self.paths.catalog_file.trim().is_empty() || self.paths.images_dir.trim().is_empty() {
            return Err(AppError::validation("paths must not be empty"));
        }
        if self.sources.is_empty() {
            return Err(AppError::validation("No sources defined"));
        }
        for source in &self.sources {
            if source.provider().is_none() {
                return Err(AppError::validation(format!(
                    "Unknown provider '{}' in sources",
                    source.provider
                )));
            }
            url::Url::parse(&source.listing_url).map_err(|e| {
                AppError::validation(format!("Invalid listing_url '{}': {e}", source.listing_url))
            })?;
        }
        Ok(())
    }

    /// Find the source entry for a provider spelling.
    pub fn source_for(&self, name: &str) -> Option<&SourceConfig> {
        let wanted = Provider::resolve(name)?;
        self.sources.iter().find(|s| s.provider() == Some(wanted))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            paths: PathsConfig::default(),
            image: ImageConfig::default(),
            sources: defaults::sources(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Minimum delay between requests to the same host, in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Per-host overrides of `request_delay_ms`
    #[serde(default)]
    pub host_delays_ms: HashMap<String, u64>,

    /// Maximum concurrent item pipelines
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl CrawlerConfig {
    /// Minimum spacing between two requests to `host`.
    pub fn delay_for(&self, host: &str) -> Duration {
        let ms = self
            .host_delays_ms
            .get(&host.to_lowercase())
            .copied()
            .unwrap_or(self.request_delay_ms);
        Duration::from_millis(ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            host_delays_ms: HashMap::new(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Exponential backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "defaults::initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "defaults::max_backoff")]
    pub max_backoff_ms: u64,

    #[serde(default = "defaults::multiplier")]
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            initial_backoff_ms: defaults::initial_backoff(),
            max_backoff_ms: defaults::max_backoff(),
            multiplier: defaults::multiplier(),
        }
    }
}

/// Consecutive-failure abort settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Abort a provider run after this many failures in a row
    #[serde(default = "defaults::max_consecutive_failures")]
    pub max_consecutive_failures: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: defaults::max_consecutive_failures(),
        }
    }
}

/// File locations, relative to the storage directory unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::catalog_file")]
    pub catalog_file: String,

    #[serde(default = "defaults::images_dir")]
    pub images_dir: String,
}

impl PathsConfig {
    /// Absolute or base-relative catalog path.
    pub fn catalog_path(&self, base: &Path) -> PathBuf {
        base.join(&self.catalog_file)
    }

    /// Absolute or base-relative images directory.
    pub fn images_path(&self, base: &Path) -> PathBuf {
        base.join(&self.images_dir)
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            catalog_file: defaults::catalog_file(),
            images_dir: defaults::images_dir(),
        }
    }
}

/// Image re-encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// JPEG quality (1-100)
    #[serde(default = "defaults::jpeg_quality")]
    pub jpeg_quality: u8,

    /// Bodies smaller than this are treated as placeholders
    #[serde(default = "defaults::min_bytes")]
    pub min_bytes: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: defaults::jpeg_quality(),
            min_bytes: defaults::min_bytes(),
        }
    }
}

/// One provider listing to scrape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Provider name (any known spelling)
    pub provider: String,

    /// Listing page URL
    pub listing_url: String,

    /// Path segment used in detail links (`/slots/{listing_path}/{slug}-slot/`)
    pub listing_path: String,

    /// Extraction rules; the default chain when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<ImageRule>>,
}

impl SourceConfig {
    /// Default gamingslots.com source for a provider.
    pub fn for_provider(provider: Provider) -> Self {
        Self {
            provider: provider.display_name().to_string(),
            listing_url: format!(
                "https://www.gamingslots.com/slots/{}/",
                provider.listing_path()
            ),
            listing_path: provider.listing_path().to_string(),
            rules: None,
        }
    }

    /// Canonical provider for this source.
    pub fn provider(&self) -> Option<Provider> {
        Provider::resolve(&self.provider)
    }

    /// Rules to apply, falling back to the default chain.
    pub fn rules(&self) -> Vec<ImageRule> {
        self.rules.clone().unwrap_or_else(ImageRule::default_chain)
    }
}

mod defaults {
    use super::SourceConfig;
    use crate::models::Provider;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        300
    }
    pub fn max_concurrent() -> usize {
        4
    }

    // Retry defaults
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn initial_backoff() -> u64 {
        500
    }
    pub fn max_backoff() -> u64 {
        8_000
    }
    pub fn multiplier() -> f64 {
        2.0
    }

    pub fn max_consecutive_failures() -> usize {
        10
    }

    // Path defaults
    pub fn catalog_file() -> String {
        "slot_providers.json".into()
    }
    pub fn images_dir() -> String {
        "public/images".into()
    }

    // Image defaults
    pub fn jpeg_quality() -> u8 {
        85
    }
    pub fn min_bytes() -> usize {
        1_000
    }

    pub fn sources() -> Vec<SourceConfig> {
        Provider::ALL
            .into_iter()
            .map(SourceConfig::for_provider)
            .collect()
    }
}
