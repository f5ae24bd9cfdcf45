// src/models/rules.rs

//! Image extraction rules applied to a game detail page.

use serde::{Deserialize, Serialize};

/// One way of finding a thumbnail on a detail page.
///
/// Rules are tried in order; the first that yields a URL wins. `{slug}` in a
/// marker is replaced by the game slug before matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageRule {
    /// `background-image: url(...)` in the `style` of the matched element
    BackgroundStyle {
        #[serde(default = "default_frame_selector")]
        selector: String,
    },

    /// `<img>` whose class list or `src` contains `marker`
    ImgMarker { marker: String },

    /// Any image URL in the page containing the slug and one of `keywords`
    SlugKeyword {
        #[serde(default = "default_keywords")]
        keywords: Vec<String>,
    },
}

fn default_frame_selector() -> String {
    "div#fpgame-frame".to_string()
}

fn default_keywords() -> Vec<String> {
    ["logo", "slot", "icon", "game"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl ImageRule {
    /// The standard chain used for gamingslots.com detail pages.
    pub fn default_chain() -> Vec<ImageRule> {
        vec![
            ImageRule::BackgroundStyle {
                selector: default_frame_selector(),
            },
            ImageRule::ImgMarker {
                marker: "gamethumb".to_string(),
            },
            ImageRule::ImgMarker {
                marker: "{slug}-slot-logo".to_string(),
            },
            ImageRule::SlugKeyword {
                keywords: default_keywords(),
            },
        ]
    }

    /// Short name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            ImageRule::BackgroundStyle { .. } => "background_style",
            ImageRule::ImgMarker { .. } => "img_marker",
            ImageRule::SlugKeyword { .. } => "slug_keyword",
        }
    }
}
