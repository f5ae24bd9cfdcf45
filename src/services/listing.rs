// src/services/listing.rs

//! Provider listing page parsing.
//!
//! Listing pages link every game as `/slots/{provider-path}/{game}-slot/`.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use regex::Regex;
use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::utils::resolve;
use crate::utils::slug::{display_name_from_slug, normalize_key};

/// Anchor texts that say nothing about the game.
const GENERIC_LINK_TEXT: &[&str] = &[
    "play",
    "play now",
    "play free",
    "review",
    "read review",
    "more",
    "demo",
];

/// One game discovered on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameLink {
    /// Game slug without the trailing `-slot`
    pub slug: String,
    /// Absolute detail page URL
    pub detail_url: String,
    /// Best available human-readable name
    pub display_name: String,
}

/// Extracts game links for one provider path.
pub struct ListingParser {
    href_pattern: Regex,
    anchor: Selector,
}

impl ListingParser {
    /// Create a parser for `/slots/{listing_path}/...` links.
    pub fn new(listing_path: &str) -> Result<Self> {
        let pattern = format!(
            r"/slots/{}/([^/?#]+)-slot/?(?:[?#]|$)",
            regex::escape(listing_path)
        );
        let href_pattern = Regex::new(&pattern).map_err(|e| {
            AppError::config(format!("Invalid listing path '{listing_path}': {e}"))
        })?;
        let anchor = Selector::parse("a[href]")
            .map_err(|e| AppError::selector("a[href]", format!("{e:?}")))?;
        Ok(Self {
            href_pattern,
            anchor,
        })
    }

    /// Extract unique game links, sorted by slug.
    pub fn extract(&self, html: &str, base_url: &str) -> Vec<GameLink> {
        let document = Html::parse_document(html);
        let mut found: BTreeMap<String, GameLink> = BTreeMap::new();

        for element in document.select(&self.anchor) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let Some(caps) = self.href_pattern.captures(href) else {
                continue;
            };
            let slug = normalize_key(&caps[1]);
            if slug.is_empty() {
                continue;
            }

            let text = element.text().collect::<String>();
            let text_name = usable_name(&text)
                .or_else(|| element.value().attr("title").and_then(usable_name));

            match found.entry(slug) {
                Entry::Occupied(mut entry) => {
                    // Upgrade a slug-derived name when a later anchor has real text.
                    let link = entry.get_mut();
                    if let Some(name) = text_name {
                        if link.display_name == display_name_from_slug(&link.slug) {
                            link.display_name = name;
                        }
                    }
                }
                Entry::Vacant(entry) => {
                    let slug = entry.key().clone();
                    let display_name =
                        text_name.unwrap_or_else(|| display_name_from_slug(&slug));
                    entry.insert(GameLink {
                        detail_url: resolve(Some(base_url), href),
                        slug,
                        display_name,
                    });
                }
            }
        }

        log::debug!("Listing {} yielded {} games", base_url, found.len());
        found.into_values().collect()
    }
}

fn usable_name(raw: &str) -> Option<String> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let lower = name.to_lowercase();
    if name.len() < 2 || name.len() > 80 || GENERIC_LINK_TEXT.contains(&lower.as_str()) {
        return None;
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <div class="grid">
            <a href="/slots/netent/gonzos-quest-slot/"><img src="/x.jpg"></a>
            <a href="/slots/netent/gonzos-quest-slot/">Gonzo's Quest</a>
            <a href="https://www.gamingslots.com/slots/netent/starburst-slot/">Play Now</a>
            <a href="/slots/netent/">NetEnt</a>
            <a href="/slots/pragmatic-play/sweet-bonanza-slot/">Sweet Bonanza</a>
            <a href="/slots/netent/dead-or-alive-2-slot/?ref=grid" title="Dead or Alive 2"></a>
            <a href="/slots/netent/reviews/">Reviews</a>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_extract_filters_by_provider_path() {
        let parser = ListingParser::new("netent").unwrap();
        let links = parser.extract(LISTING, "https://www.gamingslots.com/slots/netent/");

        let slugs: Vec<_> = links.iter().map(|l| l.slug.as_str()).collect();
        assert_eq!(slugs, ["dead-or-alive-2", "gonzos-quest", "starburst"]);
    }

    #[test]
    fn test_extract_names_and_urls() {
        let parser = ListingParser::new("netent").unwrap();
        let links = parser.extract(LISTING, "https://www.gamingslots.com/slots/netent/");

        let gonzo = links.iter().find(|l| l.slug == "gonzos-quest").unwrap();
        assert_eq!(gonzo.display_name, "Gonzo's Quest");
        assert_eq!(
            gonzo.detail_url,
            "https://www.gamingslots.com/slots/netent/gonzos-quest-slot/"
        );

        let starburst = links.iter().find(|l| l.slug == "starburst").unwrap();
        assert_eq!(starburst.display_name, "Starburst");

        let doa = links.iter().find(|l| l.slug == "dead-or-alive-2").unwrap();
        assert_eq!(doa.display_name, "Dead or Alive 2");
    }

    #[test]
    fn test_extract_tolerates_garbage() {
        let parser = ListingParser::new("playn-go").unwrap();
        assert!(parser.extract("<<<not html", "https://example.com/").is_empty());
        assert!(parser.extract("", "https://example.com/").is_empty());
    }
}
