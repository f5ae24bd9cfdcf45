//! slotcat CLI
//!
//! Local entry point for scraping, merging and maintaining the catalog.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use slotcat::{
    error::{AppError, Result},
    models::{Catalog, CatalogEntry, Config, MergePolicy, Provider},
    pipeline::{self, RunContext, cleanup, coverage},
    services::HttpSource,
    storage::{CatalogStore, LocalCatalog, merge_into},
    utils::{console, slug::normalize_key},
};

/// slotcat - Slot Game Catalog Scraper
#[derive(Parser, Debug)]
#[command(
    name = "slotcat",
    version,
    about = "Scrapes slot game thumbnails into a provider catalog"
)]
struct Cli {
    /// Storage directory holding the catalog, images and config.toml
    #[arg(short, long, default_value = ".")]
    storage_dir: PathBuf,

    /// Config file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape provider listings, download images and update the catalog
    Scrape {
        /// Provider to scrape (repeatable; default: all configured)
        #[arg(short, long = "provider")]
        providers: Vec<String>,

        /// Enumerate and locate images without downloading or saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Download missing images for existing catalog entries
    Backfill {
        /// Provider to backfill (repeatable; default: all configured)
        #[arg(short, long = "provider")]
        providers: Vec<String>,

        /// Locate images without downloading them
        #[arg(long)]
        dry_run: bool,
    },

    /// Merge another catalog file into the catalog
    Merge {
        /// JSON catalog to merge in
        incoming: PathBuf,

        /// keep-existing, prefer-incoming or reject-conflicts
        #[arg(long, default_value = "reject-conflicts")]
        policy: MergePolicy,
    },

    /// Add a single entry to the catalog
    Add {
        /// Provider name (any known spelling)
        provider: String,

        /// Game name, e.g. "Gonzo's Quest"
        game: String,

        /// Image extension
        #[arg(long, default_value = "jpg")]
        ext: String,
    },

    /// Report catalog entries without images and images without entries
    Coverage {
        /// Missing keys listed per provider
        #[arg(long, default_value_t = 10)]
        max_missing: usize,
    },

    /// Canonicalize providers, repair quoted keys and report duplicates
    Cleanup {
        /// Write changes (default only reports them)
        #[arg(long)]
        apply: bool,
    },

    /// Print the normalized slug of each name
    Slug {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Validate configuration and catalog
    Validate,

    /// Show storage locations and catalog size
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Explicit `-c` files must load; the implicit one may be absent.
fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load(path),
        None => {
            let path = cli.storage_dir.join("config.toml");
            if path.exists() {
                Config::load(&path)
            } else {
                log::info!("No config at {}, using defaults", path.display());
                Ok(Config::default())
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        log::error!("{}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let catalog_path = config.paths.catalog_path(&cli.storage_dir);
    let images_dir = config.paths.images_path(&cli.storage_dir);
    let store = LocalCatalog::new(&catalog_path);

    match cli.command {
        Command::Scrape { providers, dry_run } => {
            config.validate().map_err(|e| AppError::config(e.to_string()))?;
            let source = HttpSource::new(&config.crawler)?;
            let ctx = RunContext::new(config, images_dir).with_dry_run(dry_run);

            let summary = pipeline::run_scrape(&ctx, &source, &store, &providers).await?;
            if summary.aborted {
                log::warn!("At least one provider was cut short by the circuit breaker");
            }
        }

        Command::Backfill { providers, dry_run } => {
            config.validate().map_err(|e| AppError::config(e.to_string()))?;
            let source = HttpSource::new(&config.crawler)?;
            let ctx = RunContext::new(config, images_dir).with_dry_run(dry_run);

            let summary = pipeline::run_backfill(&ctx, &source, &store, &providers).await?;
            if summary.aborted {
                log::warn!("At least one provider was cut short by the circuit breaker");
            }
        }

        Command::Merge { incoming, policy } => {
            let incoming_catalog = LocalCatalog::new(&incoming).load().await?;
            log::info!(
                "Merging {} entries from {} ({})",
                incoming_catalog.len(),
                incoming.display(),
                policy
            );

            let outcome = merge_into(&store, &incoming_catalog, policy).await?;
            console::summary(
                "Merge",
                &[
                    ("Added", outcome.added.len().to_string()),
                    ("Changed", outcome.applied_changes().to_string()),
                    (
                        "Conflicts kept",
                        (outcome.changed.len() - outcome.applied_changes()).to_string(),
                    ),
                    ("Unchanged", outcome.unchanged.to_string()),
                    ("Total", outcome.catalog.len().to_string()),
                ],
            );
        }

        Command::Add { provider, game, ext } => {
            let entry = match Provider::resolve(&provider) {
                Some(p) => CatalogEntry::new(p, &game, &ext),
                None => {
                    log::warn!("Unknown provider '{}', storing it verbatim", provider);
                    CatalogEntry::from_parts(&provider, &game, &ext)
                }
            };
            let incoming: Catalog = [(entry.key.clone(), entry.provider.clone())].into();
            merge_into(&store, &incoming, MergePolicy::PreferIncoming).await?;

            let image = images_dir.join(coverage::image_file_for(&entry.key));
            console::success(&format!("{} -> {}", entry.key, entry.provider));
            if !image.exists() {
                log::warn!("No image at {}; run `slotcat backfill` to fetch it", image.display());
            }
        }

        Command::Coverage { max_missing } => {
            let catalog = store.load().await?;
            let report = coverage::analyze(&catalog, &images_dir).await?;
            report.print(max_missing);
            for orphan in &report.orphans {
                console::sub_item(&format!("orphan: {orphan}"));
            }
        }

        Command::Cleanup { apply } => {
            run_cleanup(&store, &images_dir, apply).await?;
        }

        Command::Slug { names } => {
            for name in names {
                println!("{}", normalize_key(&name));
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            config.validate()?;
            console::success(&format!(
                "Config OK ({} sources)",
                config.sources.len()
            ));

            if store.exists().await {
                let catalog = store.load().await?;
                let unknown = cleanup::canonicalize_providers(&catalog).unknown;
                if !unknown.is_empty() {
                    return Err(AppError::validation(format!(
                        "Unknown providers in catalog: {}",
                        unknown.into_iter().collect::<Vec<_>>().join(", ")
                    )));
                }
                console::success(&format!("Catalog OK ({} entries)", catalog.len()));
            } else {
                log::warn!("No catalog at {} yet", store.location());
            }
        }

        Command::Info => {
            let catalog = store.load_or_empty().await?;
            let images = count_files(&images_dir);
            console::summary(
                "slotcat",
                &[
                    ("Storage", cli.storage_dir.display().to_string()),
                    ("Catalog", catalog_path.display().to_string()),
                    ("Entries", catalog.len().to_string()),
                    ("Images dir", images_dir.display().to_string()),
                    ("Image files", images.to_string()),
                    ("Sources", config.sources.len().to_string()),
                ],
            );
        }
    }

    Ok(())
}

async fn run_cleanup(store: &LocalCatalog, images_dir: &Path, apply: bool) -> Result<()> {
    let catalog = store.load().await?;

    let canonical = cleanup::canonicalize_providers(&catalog);
    let repair = cleanup::repair_keys(&canonical.catalog, images_dir, apply).await?;
    let duplicates = cleanup::find_duplicates(&repair.catalog);

    console::header("Duplicates (report only)");
    for group in &duplicates {
        let tag = if group.is_cross_provider() {
            "cross-provider"
        } else {
            "same provider"
        };
        console::sub_item(&format!("{} [{}]", group.game_slug, tag));
        for (key, provider) in &group.entries {
            console::sub_item(&format!("    {key} ({provider})"));
        }
    }

    let changed = canonical.rewritten > 0 || !repair.key_renames.is_empty();
    if apply && changed {
        store.save(&repair.catalog).await?;
    }

    console::summary(
        if apply { "Cleanup" } else { "Cleanup (dry run)" },
        &[
            ("Providers rewritten", canonical.rewritten.to_string()),
            ("Unknown providers", canonical.unknown.len().to_string()),
            ("Keys renamed", repair.key_renames.len().to_string()),
            ("Images renamed", repair.file_renames.len().to_string()),
            ("Rename conflicts", repair.conflicts.len().to_string()),
            ("Duplicate groups", duplicates.len().to_string()),
        ],
    );
    if !apply && (changed || !repair.is_empty()) {
        log::info!("Re-run with --apply to write these changes");
    }
    Ok(())
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .count()
        })
        .unwrap_or(0)
}
