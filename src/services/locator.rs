// src/services/locator.rs

//! Thumbnail discovery on game detail pages.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::ImageRule;
use crate::utils::resolve;

static BACKGROUND_URL: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r#"background(?:-image)?\s*:\s*url\(\s*['"]?([^'")]+?)['"]?\s*\)"#)
        .case_insensitive(true)
        .build()
        .expect("valid background regex")
});

static IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r#"https?://[^\s"'<>()]+?\.(?:jpe?g|png|webp)"#)
        .case_insensitive(true)
        .build()
        .expect("valid image url regex")
});

/// Attributes that may carry the real image URL, lazy-loading ones first.
const SRC_ATTRS: &[&str] = &["data-src", "data-lazy-src", "src"];

enum CompiledRule {
    Background(Selector),
    ImgMarker(String),
    SlugKeyword(Vec<String>),
}

/// Applies an ordered rule list to detail page HTML.
pub struct ImageLocator {
    /// Compiled rules with their names, in order
    rules: Vec<(&'static str, CompiledRule)>,
    img: Selector,
    base_url: Option<String>,
}

impl ImageLocator {
    /// Compile `rules`. Relative image URLs resolve against `base_url`.
    pub fn new(rules: &[ImageRule], base_url: Option<String>) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| -> Result<(&'static str, CompiledRule)> {
                let compiled = match rule {
                    ImageRule::BackgroundStyle { selector } => Selector::parse(selector)
                        .map(CompiledRule::Background)
                        .map_err(|e| AppError::selector(selector, format!("{e:?}")))?,
                    ImageRule::ImgMarker { marker } => CompiledRule::ImgMarker(marker.clone()),
                    ImageRule::SlugKeyword { keywords } => CompiledRule::SlugKeyword(
                        keywords.iter().map(|k| k.to_lowercase()).collect(),
                    ),
                };
                Ok((rule.name(), compiled))
            })
            .collect::<Result<Vec<_>>>()?;

        let img = Selector::parse("img").map_err(|e| AppError::selector("img", format!("{e:?}")))?;

        Ok(Self {
            rules,
            img,
            base_url,
        })
    }

    /// Locator with the default rule chain.
    pub fn with_default_rules(base_url: Option<String>) -> Result<Self> {
        Self::new(&ImageRule::default_chain(), base_url)
    }

    /// Find the thumbnail URL for `slug`, trying each rule in order.
    pub fn locate_image_url(&self, page_html: &str, slug: &str) -> Option<String> {
        let document = Html::parse_document(page_html);

        let (name, found) = self.rules.iter().find_map(|(name, rule)| {
            let url = match rule {
                CompiledRule::Background(selector) => background_url(&document, selector),
                CompiledRule::ImgMarker(marker) => {
                    self.img_with_marker(&document, &marker.replace("{slug}", slug))
                }
                CompiledRule::SlugKeyword(keywords) => slug_keyword_url(page_html, slug, keywords),
            };
            url.map(|u| (*name, u))
        })?;

        log::debug!("{}: image found by rule {}", slug, name);
        Some(resolve(self.base_url.as_deref(), &found))
    }

    fn img_with_marker(&self, document: &Html, marker: &str) -> Option<String> {
        if marker.is_empty() {
            return None;
        }
        document.select(&self.img).find_map(|img| {
            let el = img.value();
            let in_class = el.attr("class").is_some_and(|c| c.contains(marker));
            let in_src = SRC_ATTRS
                .iter()
                .filter_map(|a| el.attr(a))
                .any(|s| s.contains(marker));
            if in_class || in_src {
                image_src(img)
            } else {
                None
            }
        })
    }
}

fn background_url(document: &Html, selector: &Selector) -> Option<String> {
    document.select(selector).find_map(|el| {
        let style = el.value().attr("style")?;
        let caps = BACKGROUND_URL.captures(style)?;
        let url = caps[1].trim();
        (!url.is_empty()).then(|| url.to_string())
    })
}

fn image_src(img: ElementRef<'_>) -> Option<String> {
    SRC_ATTRS
        .iter()
        .filter_map(|a| img.value().attr(a))
        .map(str::trim)
        .find(|s| !s.is_empty() && !s.starts_with("data:"))
        .map(String::from)
}

fn slug_keyword_url(page_html: &str, slug: &str, keywords: &[String]) -> Option<String> {
    if slug.is_empty() {
        return None;
    }
    let html = page_html.replace("&amp;", "&");
    IMAGE_URL
        .find_iter(&html)
        .map(|m| m.as_str())
        .find(|url| {
            let lower = url.to_lowercase();
            lower.contains(slug) && keywords.iter().any(|k| lower.contains(k.as_str()))
        })
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> ImageLocator {
        ImageLocator::with_default_rules(Some("https://www.gamingslots.com/slots/netent/".into()))
            .unwrap()
    }

    #[test]
    fn test_background_style_frame() {
        let html = r#"<div id="fpgame-frame" style="background-image:url('https://example.com/x.jpg')"></div>"#;
        assert_eq!(
            locator().locate_image_url(html, "anything"),
            Some("https://example.com/x.jpg".to_string())
        );
    }

    #[test]
    fn test_background_wins_over_later_rules() {
        let html = r#"
            <img class="gamethumb" src="https://cdn.example.com/other.png">
            <div id="fpgame-frame" style="background: URL( &quot;/wp-content/frame.webp&quot; ) no-repeat"></div>
        "#;
        assert_eq!(
            locator().locate_image_url(html, "starburst"),
            Some("https://www.gamingslots.com/wp-content/frame.webp".to_string())
        );
    }

    #[test]
    fn test_img_marker_class_and_lazy_src() {
        let html = r#"
            <img src="/logo.png">
            <img class="wp-image gamethumb" src="data:image/gif;base64,R0lGOD" data-src="/uploads/starburst.png">
        "#;
        assert_eq!(
            locator().locate_image_url(html, "starburst"),
            Some("https://www.gamingslots.com/uploads/starburst.png".to_string())
        );
    }

    #[test]
    fn test_img_marker_slug_placeholder() {
        let html = r#"<img src="https://cdn.example.com/2023/gonzos-quest-slot-logo.png">"#;
        assert_eq!(
            locator().locate_image_url(html, "gonzos-quest"),
            Some("https://cdn.example.com/2023/gonzos-quest-slot-logo.png".to_string())
        );
    }

    #[test]
    fn test_slug_keyword_in_raw_html() {
        let html = r#"<script>var cfg = {"img":"https://cdn.example.com/games/starburst-icon.webp?v=1&amp;w=2"};</script>"#;
        assert_eq!(
            locator().locate_image_url(html, "starburst"),
            Some("https://cdn.example.com/games/starburst-icon.webp".to_string())
        );
    }

    #[test]
    fn test_slug_keyword_requires_slug() {
        let html = r#"<a href="https://cdn.example.com/games/other-logo.jpg">x</a>"#;
        assert_eq!(locator().locate_image_url(html, "starburst"), None);
    }

    #[test]
    fn test_no_match_is_none() {
        assert_eq!(locator().locate_image_url("<html></html>", "starburst"), None);
        assert_eq!(locator().locate_image_url("", "starburst"), None);
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let rules = vec![ImageRule::BackgroundStyle {
            selector: "div[".into(),
        }];
        assert!(matches!(
            ImageLocator::new(&rules, None),
            Err(AppError::Selector { .. })
        ));
    }
}
