// src/services/source.rs

//! Page and image retrieval.
//!
//! [`PageSource`] is the seam between the scraping logic and the network.
//! [`HttpSource`] is the production implementation: a shared reqwest client
//! with a minimum spacing between requests to the same host and at most one
//! in-flight request per URL.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tokio::time::{Instant, sleep_until};

use crate::error::{FetchError, Result};
use crate::models::CrawlerConfig;
use crate::utils::{get_domain, http};

/// Anything that can fetch pages and binary payloads by URL.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch a page body as text.
    async fn fetch_text(&self, url: &str) -> std::result::Result<String, FetchError>;

    /// Fetch a binary payload.
    async fn fetch_bytes(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError>;
}

/// Rate-limited HTTP implementation of [`PageSource`].
pub struct HttpSource {
    client: Client,
    config: CrawlerConfig,
    /// Earliest instant the next request to each host may start
    next_slot: tokio::sync::Mutex<HashMap<String, Instant>>,
    /// One lock per URL currently being fetched
    in_flight: InFlightMap,
}

type InFlightMap = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// A claim on a URL's lock. Dropping it, including by cancelling the request
/// future, removes the map entry once no other claim remains.
struct UrlClaim<'a> {
    map: &'a InFlightMap,
    url: String,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for UrlClaim<'_> {
    fn drop(&mut self) {
        let mut map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        // The map's copy plus this claim's.
        if map.get(&self.url).is_some_and(|l| Arc::strong_count(l) == 2) {
            map.remove(&self.url);
        }
    }
}

impl HttpSource {
    /// Build a source with a client configured from `config`.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = http::create_async_client(config)?;
        Ok(Self::with_client(client, config.clone()))
    }

    /// Build a source around an existing client.
    pub fn with_client(client: Client, config: CrawlerConfig) -> Self {
        Self {
            client,
            config,
            next_slot: tokio::sync::Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for this host's next free slot and reserve the one after it.
    async fn throttle(&self, url: &str) {
        let host = get_domain(url).unwrap_or_default();
        let delay = self.config.delay_for(&host);

        let start_at = {
            let mut slots = self.next_slot.lock().await;
            let now = Instant::now();
            let start_at = slots.get(&host).copied().filter(|t| *t > now).unwrap_or(now);
            slots.insert(host.clone(), start_at + delay);
            start_at
        };

        if start_at > Instant::now() {
            log::debug!("Throttling {} until its next slot", host);
            sleep_until(start_at).await;
        }
    }

    fn claim_url(&self, url: &str) -> UrlClaim<'_> {
        let mut map = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = Arc::clone(map.entry(url.to_string()).or_default());
        UrlClaim {
            map: &self.in_flight,
            url: url.to_string(),
            lock,
        }
    }

    /// Issue a GET, serialized per URL and spaced per host.
    async fn get(&self, url: &str) -> std::result::Result<Response, FetchError> {
        let claim = self.claim_url(url);
        let _guard = claim.lock.lock().await;
        self.throttle(url).await;
        log::debug!("GET {}", url);
        match self.client.get(url).send().await {
            Ok(response) => check_status(response),
            Err(e) => Err(FetchError::from(e)),
        }
    }
}

fn check_status(response: Response) -> std::result::Result<Response, FetchError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound);
    }
    if !status.is_success() {
        return Err(FetchError::Http(status.as_u16()));
    }
    Ok(response)
}

#[async_trait]
impl PageSource for HttpSource {
    async fn fetch_text(&self, url: &str) -> std::result::Result<String, FetchError> {
        let response = self.get(url).await?;
        response.text().await.map_err(FetchError::from)
    }

    async fn fetch_bytes(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let response = self.get(url).await?;
        let bytes = response.bytes().await.map_err(FetchError::from)?;
        Ok(bytes.to_vec())
    }
}
