// src/pipeline/run.rs

//! Scrape run driver.
//!
//! Two ways in. A scrape fetches each provider's listing and visits every
//! game page; a backfill starts from catalog entries whose image is missing.
//! Both store thumbnails and merge the resulting `(key, provider)` pairs into
//! the catalog. Item work runs concurrently; the results are drained by a
//! single loop that alone builds the incoming catalog, and the store is
//! written once per provider.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};

use crate::error::{AppError, FetchError, Result};
use crate::models::{
    Catalog, CatalogEntry, Config, IMAGE_EXTENSIONS, MergePolicy, Provider, SourceConfig,
    game_slug_of,
};
use crate::pipeline::coverage::{self, image_file_for};
use crate::pipeline::{CircuitBreaker, RetryPolicy};
use crate::services::{
    GameLink, ImageFetcher, ImageLocator, ListingParser, PageSource, StoreOutcome,
};
use crate::storage::{CatalogStore, merge_into, remove_stale_temps};
use crate::utils::slug::display_name_from_slug;
use crate::utils::{console, resolve};

/// Settings shared by every provider of one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: Config,
    pub images_dir: PathBuf,
    /// Enumerate and locate only; nothing is downloaded or saved
    pub dry_run: bool,
    pub policy: MergePolicy,
    retry: RetryPolicy,
    fetcher: ImageFetcher,
}

impl RunContext {
    pub fn new(config: Config, images_dir: impl Into<PathBuf>) -> Self {
        let retry = RetryPolicy::new(&config.retry);
        let fetcher = ImageFetcher::new(&config.image, retry.clone());
        Self {
            config,
            images_dir: images_dir.into(),
            dry_run: false,
            policy: MergePolicy::KeepExisting,
            retry,
            fetcher,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.fetcher = ImageFetcher::new(&self.config.image, retry.clone());
        self.retry = retry;
        self
    }

    fn image_path(&self, key: &str) -> PathBuf {
        self.images_dir.join(image_file_for(key))
    }
}

/// Counters for one provider or a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Images downloaded and stored
    pub ok: usize,
    /// Items that failed to fetch, decode or write
    pub failed: usize,
    /// Items whose image already existed
    pub skipped: usize,
    /// Detail pages with no recognizable image
    pub no_image: usize,
    /// Image URLs found during a dry run
    pub located: usize,
    /// New catalog keys saved
    pub added: usize,
    /// Whether a circuit breaker cut a provider short
    pub aborted: bool,
    pub failures_by_kind: BTreeMap<String, usize>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.ok + self.failed + self.skipped + self.no_image + self.located
    }

    fn record_failure(&mut self, error: &FetchError) {
        self.failed += 1;
        *self
            .failures_by_kind
            .entry(error.kind().to_string())
            .or_default() += 1;
    }

    /// Add another summary's counters into this one.
    pub fn absorb(&mut self, other: &RunSummary) {
        self.ok += other.ok;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.no_image += other.no_image;
        self.located += other.located;
        self.added += other.added;
        self.aborted |= other.aborted;
        for (kind, count) in &other.failures_by_kind {
            *self.failures_by_kind.entry(kind.clone()).or_default() += count;
        }
    }

    /// Print the end-of-run block.
    pub fn print(&self, title: &str) {
        let kinds = if self.failures_by_kind.is_empty() {
            "-".to_string()
        } else {
            self.failures_by_kind
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        console::summary(
            title,
            &[
                ("Downloaded", self.ok.to_string()),
                ("Already present", self.skipped.to_string()),
                ("No image", self.no_image.to_string()),
                ("Located (dry run)", self.located.to_string()),
                ("Failed", self.failed.to_string()),
                ("Failure kinds", kinds),
                ("New catalog keys", self.added.to_string()),
                ("Aborted", self.aborted.to_string()),
            ],
        );
    }
}

/// Result of one game's pipeline.
#[derive(Debug)]
enum ItemOutcome {
    Stored,
    /// An image is on disk under this key
    AlreadyPresent(String),
    NoImage,
    Located(String),
    Failed(FetchError),
}

/// Bare game slug to its existing `(key, provider)` pair.
type KnownGames = HashMap<String, (String, String)>;

/// One game to process and the catalog pair it ends up as.
#[derive(Debug, Clone)]
struct WorkItem {
    link: GameLink,
    /// Key the image is stored under
    key: String,
    /// Catalog value recorded for `key`
    provider_name: String,
    /// Whether `key` is already in the catalog
    catalogued: bool,
}

impl WorkItem {
    /// Item for a game found on a listing page. Reuses the catalog's key
    /// when the game is already known under any spelling.
    fn from_listing(link: GameLink, provider: Provider, known: &KnownGames) -> Self {
        match known.get(&link.slug) {
            Some((key, value)) => Self {
                key: key.clone(),
                provider_name: value.clone(),
                catalogued: true,
                link,
            },
            None => Self {
                key: CatalogEntry::new(provider, &link.slug, "jpg").key,
                provider_name: provider.display_name().to_string(),
                catalogued: false,
                link,
            },
        }
    }

    /// Item for a catalog entry whose image is missing.
    fn from_catalog(key: &str, value: &str, listing_url: &str) -> Self {
        let slug = game_slug_of(key, value);
        let base = if listing_url.ends_with('/') {
            listing_url.to_string()
        } else {
            format!("{listing_url}/")
        };
        Self {
            link: GameLink {
                detail_url: resolve(Some(&base), &format!("{slug}-slot/")),
                display_name: display_name_from_slug(&slug),
                slug,
            },
            key: key.to_string(),
            provider_name: value.to_string(),
            catalogued: true,
        }
    }
}

/// Catalog entries of `provider`, keyed by bare game slug.
fn known_games(catalog: &Catalog, provider: Provider) -> KnownGames {
    catalog
        .iter()
        .filter(|(_, value)| Provider::resolve(value) == Some(provider))
        .map(|(key, value)| (game_slug_of(key, value), (key.clone(), value.clone())))
        .filter(|(slug, _)| !slug.is_empty())
        .collect()
}

/// Scrape one provider listing and merge its results into `store`.
///
/// Listing failures and per-item failures are counted, not returned. Only
/// catalog and configuration errors are `Err`.
pub async fn run_provider<S>(
    ctx: &RunContext,
    source: &S,
    store: &dyn CatalogStore,
    source_config: &SourceConfig,
) -> Result<RunSummary>
where
    S: PageSource + ?Sized,
{
    let provider = provider_of(source_config)?;
    let parser = ListingParser::new(&source_config.listing_path)?;
    let locator = ImageLocator::new(&source_config.rules(), None)?;
    let known = known_games(&store.load_or_empty().await?, provider);

    let listing_url = source_config.listing_url.as_str();
    let listing = match ctx
        .retry
        .run(listing_url, || source.fetch_text(listing_url))
        .await
    {
        Ok(html) => html,
        Err(e) => {
            log::warn!("{}: listing {} failed: {}", provider, listing_url, e);
            let mut summary = RunSummary::default();
            summary.record_failure(&e);
            return Ok(summary);
        }
    };

    let links = parser.extract(&listing, listing_url);
    if links.is_empty() {
        log::warn!("{}: no games found on {}", provider, listing_url);
        return Ok(RunSummary::default());
    }
    console::sub_item(&format!("{}: {} games listed", provider, links.len()));

    let items = links
        .into_iter()
        .map(|link| WorkItem::from_listing(link, provider, &known))
        .collect();
    process_items(ctx, source, store, &locator, provider, items).await
}

/// Fill in missing images for catalog entries of one provider.
///
/// Detail pages are addressed as `{listing_url}{slug}-slot/`. Entries keep
/// their existing key and value.
pub async fn backfill_provider<S>(
    ctx: &RunContext,
    source: &S,
    store: &dyn CatalogStore,
    source_config: &SourceConfig,
    missing: &[(String, String)],
) -> Result<RunSummary>
where
    S: PageSource + ?Sized,
{
    let provider = provider_of(source_config)?;
    let locator = ImageLocator::new(&source_config.rules(), None)?;

    let items: Vec<WorkItem> = missing
        .iter()
        .map(|(key, value)| WorkItem::from_catalog(key, value, &source_config.listing_url))
        .filter(|item| !item.link.slug.is_empty())
        .collect();
    if items.is_empty() {
        return Ok(RunSummary::default());
    }
    console::sub_item(&format!("{}: {} entries without image", provider, items.len()));

    process_items(ctx, source, store, &locator, provider, items).await
}

fn provider_of(source_config: &SourceConfig) -> Result<Provider> {
    source_config.provider().ok_or_else(|| {
        AppError::config(format!("Unknown provider '{}'", source_config.provider))
    })
}

/// Run `items` concurrently, drain them in one loop and merge the results.
async fn process_items<S>(
    ctx: &RunContext,
    source: &S,
    store: &dyn CatalogStore,
    locator: &ImageLocator,
    provider: Provider,
    items: Vec<WorkItem>,
) -> Result<RunSummary>
where
    S: PageSource + ?Sized,
{
    let concurrency = ctx.config.crawler.max_concurrent.max(1);
    let mut results = stream::iter(items)
        .map(|item| async move {
            let outcome = process_game(ctx, source, locator, provider, &item).await;
            (item, outcome)
        })
        .buffer_unordered(concurrency);

    let mut summary = RunSummary::default();
    let mut breaker = CircuitBreaker::with_config(&ctx.config.circuit_breaker);
    let mut incoming = Catalog::new();

    while let Some((item, outcome)) = results.next().await {
        let name = item.link.display_name.as_str();
        match outcome {
            ItemOutcome::Stored => {
                summary.ok += 1;
                breaker.record_success();
                incoming.insert(item.key, item.provider_name);
            }
            ItemOutcome::AlreadyPresent(key) => {
                summary.skipped += 1;
                if !item.catalogued || key != item.key {
                    incoming.insert(key, item.provider_name);
                }
            }
            ItemOutcome::NoImage => {
                summary.no_image += 1;
                breaker.record_success();
                log::info!("{}: no image for {} on {}", provider, name, item.link.detail_url);
            }
            ItemOutcome::Located(url) => {
                summary.located += 1;
                breaker.record_success();
                log::info!("{}: {} ({}) -> {}", provider, name, item.key, url);
            }
            ItemOutcome::Failed(e) => {
                log::warn!("{}: {} failed: {}", provider, name, e);
                summary.record_failure(&e);
                breaker.record_failure();
            }
        }

        if let Err(e) = breaker.validate() {
            log::error!("{}: {}; saving what succeeded", provider, e);
            summary.aborted = true;
            break;
        }
    }
    drop(results);

    if ctx.dry_run || incoming.is_empty() {
        return Ok(summary);
    }

    let merged = merge_into(store, &incoming, ctx.policy).await?;
    summary.added = merged.added.len();
    Ok(summary)
}

async fn process_game<S>(
    ctx: &RunContext,
    source: &S,
    locator: &ImageLocator,
    provider: Provider,
    item: &WorkItem,
) -> ItemOutcome
where
    S: PageSource + ?Sized,
{
    if let Some(key) = existing_image(ctx, provider, item).await {
        return ItemOutcome::AlreadyPresent(key);
    }

    let link = &item.link;
    let detail_url = link.detail_url.as_str();
    let page = match ctx.retry.run(detail_url, || source.fetch_text(detail_url)).await {
        Ok(page) => page,
        Err(e) => return ItemOutcome::Failed(e),
    };

    let Some(found) = locator.locate_image_url(&page, &link.slug) else {
        return ItemOutcome::NoImage;
    };
    let image_url = resolve(Some(detail_url), &found);

    if ctx.dry_run {
        return ItemOutcome::Located(image_url);
    }

    let dest = ctx.image_path(&item.key);
    match ctx.fetcher.fetch_and_store(source, &image_url, &dest).await {
        Ok(StoreOutcome::Downloaded(_)) => ItemOutcome::Stored,
        Ok(StoreOutcome::AlreadyPresent(_)) => ItemOutcome::AlreadyPresent(item.key.clone()),
        Err(e) => ItemOutcome::Failed(e),
    }
}

/// Key of an image already on disk for `item`.
///
/// A catalogued key only counts its own file. A new game also matches
/// `{prefix}-{slug}.{ext}` under any of the provider's key prefixes and
/// image extensions.
async fn existing_image(
    ctx: &RunContext,
    provider: Provider,
    item: &WorkItem,
) -> Option<String> {
    if image_exists(&ctx.image_path(&item.key)).await {
        return Some(item.key.clone());
    }
    if item.catalogued {
        return None;
    }
    for prefix in provider.key_prefixes() {
        for ext in IMAGE_EXTENSIONS {
            let candidate = format!("{prefix}-{}.{ext}", item.link.slug);
            if image_exists(&ctx.images_dir.join(&candidate)).await {
                return Some(candidate);
            }
        }
    }
    None
}

async fn image_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Scrape the named providers (all configured ones when empty).
pub async fn run_scrape<S>(
    ctx: &RunContext,
    source: &S,
    store: &dyn CatalogStore,
    providers: &[String],
) -> Result<RunSummary>
where
    S: PageSource + ?Sized,
{
    let sources = select_sources(&ctx.config, providers)?;

    // Fail before any network work if the catalog cannot be read.
    let existing = store.load_or_empty().await?;
    log::info!(
        "Catalog {} has {} entries",
        store.location(),
        existing.len()
    );

    sweep_temps(ctx).await?;

    console::header(if ctx.dry_run {
        "Scrape (dry run)"
    } else {
        "Scrape"
    });

    let mut total = RunSummary::default();
    for (i, source_config) in sources.iter().enumerate() {
        console::step(i + 1, sources.len(), &source_config.provider);
        match run_provider(ctx, source, store, source_config).await {
            Ok(summary) => {
                console::sub_item(&format!(
                    "ok={} skipped={} no_image={} failed={}",
                    summary.ok, summary.skipped, summary.no_image, summary.failed
                ));
                total.absorb(&summary);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::error!("{}: {}", source_config.provider, e);
            }
        }
    }

    console::separator();
    total.print("Scrape run");
    Ok(total)
}

/// Download missing images for catalog entries of the named providers (all
/// configured ones when empty).
pub async fn run_backfill<S>(
    ctx: &RunContext,
    source: &S,
    store: &dyn CatalogStore,
    providers: &[String],
) -> Result<RunSummary>
where
    S: PageSource + ?Sized,
{
    let sources = select_sources(&ctx.config, providers)?;
    let catalog = store.load_or_empty().await?;
    let report = coverage::analyze(&catalog, &ctx.images_dir).await?;
    log::info!(
        "{} of {} catalog entries have no image",
        report.total() - report.with_image(),
        report.total()
    );

    sweep_temps(ctx).await?;

    console::header(if ctx.dry_run {
        "Backfill (dry run)"
    } else {
        "Backfill"
    });

    let mut total = RunSummary::default();
    for (i, source_config) in sources.iter().enumerate() {
        console::step(i + 1, sources.len(), &source_config.provider);
        let wanted = source_config.provider();
        let missing: Vec<(String, String)> = report
            .providers
            .iter()
            .filter(|p| wanted.is_some() && Provider::resolve(&p.provider) == wanted)
            .flat_map(|p| p.missing.iter().map(|key| (key.clone(), p.provider.clone())))
            .collect();
        if missing.is_empty() {
            console::sub_item("nothing missing");
            continue;
        }

        match backfill_provider(ctx, source, store, source_config, &missing).await {
            Ok(summary) => {
                console::sub_item(&format!(
                    "ok={} skipped={} no_image={} failed={}",
                    summary.ok, summary.skipped, summary.no_image, summary.failed
                ));
                total.absorb(&summary);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::error!("{}: {}", source_config.provider, e);
            }
        }
    }

    console::separator();
    total.print("Backfill run");
    Ok(total)
}

async fn sweep_temps(ctx: &RunContext) -> Result<()> {
    if ctx.dry_run {
        return Ok(());
    }
    let removed = remove_stale_temps(&ctx.images_dir).await?;
    if removed > 0 {
        log::info!("Removed {} stale temp files", removed);
    }
    Ok(())
}

fn select_sources<'a>(config: &'a Config, providers: &[String]) -> Result<Vec<&'a SourceConfig>> {
    if providers.is_empty() {
        return Ok(config.sources.iter().collect());
    }
    providers
        .iter()
        .map(|name| {
            config.source_for(name).ok_or_else(|| {
                let known = Provider::resolve(name).is_some();
                AppError::config(if known {
                    format!("Provider '{name}' has no configured source")
                } else {
                    format!("Unknown provider '{name}'")
                })
            })
        })
        .collect()
}
