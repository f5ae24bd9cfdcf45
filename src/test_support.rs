//! In-memory [`PageSource`] for network-free tests.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::FetchError;
use crate::services::PageSource;

#[derive(Debug, Clone)]
pub enum Canned {
    Body(Vec<u8>),
    Status(u16),
    Timeout,
}

#[derive(Default)]
pub struct MockSource {
    responses: Mutex<HashMap<String, Canned>>,
    hits: Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(self, url: &str, body: &str) -> Self {
        self.set(url, Canned::Body(body.as_bytes().to_vec()));
        self
    }

    pub fn with_bytes(self, url: &str, body: Vec<u8>) -> Self {
        self.set(url, Canned::Body(body));
        self
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.set(url, Canned::Status(status));
        self
    }

    pub fn with_timeout(self, url: &str) -> Self {
        self.set(url, Canned::Timeout);
        self
    }

    pub fn set(&self, url: &str, canned: Canned) {
        self.responses.lock().unwrap().insert(url.to_string(), canned);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn hits(&self, url: &str) -> usize {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn respond(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.hits.lock().unwrap().entry(url.to_string()).or_default() += 1;
        match self.responses.lock().unwrap().get(url).cloned() {
            Some(Canned::Body(body)) => Ok(body),
            Some(Canned::Status(404)) | None => Err(FetchError::NotFound),
            Some(Canned::Status(status)) => Err(FetchError::Http(status)),
            Some(Canned::Timeout) => Err(FetchError::Timeout),
        }
    }
}

#[async_trait]
impl PageSource for MockSource {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let body = self.respond(url)?;
        String::from_utf8(body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.respond(url)
    }
}

/// A noisy RGBA PNG large enough to pass the placeholder size check.
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_fn(width, height, |x, y| {
        let v = ((x * 31) ^ (y * 17)) as u8;
        image::Rgba([v, v.wrapping_mul(3), v.wrapping_add(90), (x % 256) as u8])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
