//! Scrape driver against an in-memory page source.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;

use async_trait::async_trait;
use slotcat::error::FetchError;
use slotcat::models::Config;
use slotcat::pipeline::{RetryPolicy, RunContext, coverage, run_backfill, run_scrape};
use slotcat::services::PageSource;
use slotcat::storage::{CatalogStore, LocalCatalog};
use tempfile::TempDir;

#[derive(Default)]
struct FakeSite {
    pages: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl FakeSite {
    fn page(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.pages.insert(url.to_string(), body.into());
        self
    }

    fn requested(&self, url: &str) -> bool {
        self.requests.lock().unwrap().iter().any(|u| u == url)
    }

    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages.get(url).cloned().ok_or(FetchError::NotFound)
    }
}

#[async_trait]
impl PageSource for FakeSite {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let body = self.get(url)?;
        String::from_utf8(body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.get(url)
    }
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x * 7) as u8, (y * 13) as u8, ((x ^ y) * 5) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn site() -> FakeSite {
    FakeSite::default()
        .page(
            "https://www.gamingslots.com/slots/netent/",
            r#"<a href="/slots/netent/gonzos-quest-slot/">Gonzo's Quest</a>
               <a href="/slots/netent/starburst-slot/">Starburst</a>
               <a href="/slots/netent/missing-slot/">Missing</a>"#,
        )
        .page(
            "https://www.gamingslots.com/slots/netent/gonzos-quest-slot/",
            r#"<div id="fpgame-frame" style="background-image:url('https://example.com/gq.png')"></div>"#,
        )
        .page(
            "https://www.gamingslots.com/slots/netent/starburst-slot/",
            r#"<img class="gamethumb" src="/wp-content/uploads/starburst.png">"#,
        )
        .page("https://example.com/gq.png", png(48, 32))
        .page(
            "https://www.gamingslots.com/wp-content/uploads/starburst.png",
            png(32, 32),
        )
}

fn context(tmp: &TempDir) -> RunContext {
    let mut config = Config::default();
    config.image.min_bytes = 16;
    RunContext::new(config, tmp.path().join("public/images")).with_retry(RetryPolicy::none())
}

#[tokio::test]
async fn scrape_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let store = LocalCatalog::new(tmp.path().join("slot_providers.json"));
    let ctx = context(&tmp);
    let providers = vec!["NetEnt".to_string()];

    let first = run_scrape(&ctx, &site(), &store, &providers).await.unwrap();
    assert_eq!(first.ok, 2);
    assert_eq!(first.failed, 1);
    assert_eq!(first.failures_by_kind.get("not_found"), Some(&1));

    let catalog = store.load().await.unwrap();
    assert_eq!(
        catalog.keys().collect::<Vec<_>>(),
        ["netent-gonzos-quest.jpg", "netent-starburst.jpg"]
    );

    // Second run finds every image on disk and never asks for them again.
    let again = site();
    let second = run_scrape(&ctx, &again, &store, &providers).await.unwrap();
    assert_eq!(second.skipped, 2);
    assert_eq!(second.ok, 0);
    assert_eq!(second.added, 0);
    assert!(!again.requested("https://example.com/gq.png"));
    assert!(!again.requested("https://www.gamingslots.com/slots/netent/gonzos-quest-slot/"));

    let report = coverage::analyze(&store.load().await.unwrap(), &ctx.images_dir)
        .await
        .unwrap();
    assert!(report.is_complete());
}

#[tokio::test]
async fn stale_temp_files_are_swept() {
    let tmp = TempDir::new().unwrap();
    let store = LocalCatalog::new(tmp.path().join("slot_providers.json"));
    let ctx = context(&tmp);
    std::fs::create_dir_all(&ctx.images_dir).unwrap();
    let stale = ctx.images_dir.join("netent-starburst.jpg.tmp");
    std::fs::write(&stale, b"half written").unwrap();

    run_scrape(&ctx, &site(), &store, &["netent".to_string()])
        .await
        .unwrap();

    assert!(!stale.exists());
    assert!(ctx.images_dir.join("netent-starburst.jpg").exists());
}

#[tokio::test]
async fn backfill_restores_deleted_image() {
    let tmp = TempDir::new().unwrap();
    let store = LocalCatalog::new(tmp.path().join("slot_providers.json"));
    let ctx = context(&tmp);
    let providers = vec!["NetEnt".to_string()];

    run_scrape(&ctx, &site(), &store, &providers).await.unwrap();
    let lost = ctx.images_dir.join("netent-starburst.jpg");
    std::fs::remove_file(&lost).unwrap();

    let again = site();
    let summary = run_backfill(&ctx, &again, &store, &providers).await.unwrap();

    assert_eq!(summary.ok, 1);
    assert_eq!(summary.added, 0);
    assert!(lost.exists());
    assert!(!again.requested("https://www.gamingslots.com/slots/netent/"));
    assert!(!again.requested("https://www.gamingslots.com/slots/netent/gonzos-quest-slot/"));

    let report = coverage::analyze(&store.load().await.unwrap(), &ctx.images_dir)
        .await
        .unwrap();
    assert!(report.is_complete());
}
