// src/models/provider.rs

//! Closed registry of known game studios.
//!
//! Scraped pages and older catalog files spell the same studio several ways
//! ("Play'n GO", "Playn GO", "play-n-go", "Play and Go"). Every spelling is
//! resolved to one [`Provider`] at ingestion time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::utils::slug::normalize_key;

/// A slot-game studio known to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Provider {
    PragmaticPlay,
    NetEnt,
    PlaynGo,
    HacksawGaming,
    RedTiger,
    RelaxGaming,
    NolimitCity,
    Playson,
    BlueprintGaming,
    ElkStudios,
    Gamomat,
    InspiredGaming,
    PeterAndSons,
    OneXTwoGaming,
    BackseatGaming,
    KalambaGames,
}

impl Provider {
    /// Every known provider, in display order.
    pub const ALL: [Provider; 16] = [
        Provider::PragmaticPlay,
        Provider::NetEnt,
        Provider::PlaynGo,
        Provider::HacksawGaming,
        Provider::RedTiger,
        Provider::RelaxGaming,
        Provider::NolimitCity,
        Provider::Playson,
        Provider::BlueprintGaming,
        Provider::ElkStudios,
        Provider::Gamomat,
        Provider::InspiredGaming,
        Provider::PeterAndSons,
        Provider::OneXTwoGaming,
        Provider::BackseatGaming,
        Provider::KalambaGames,
    ];

    /// Canonical display name stored as the catalog value.
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::PragmaticPlay => "Pragmatic Play",
            Provider::NetEnt => "NetEnt",
            Provider::PlaynGo => "Play'n GO",
            Provider::HacksawGaming => "Hacksaw Gaming",
            Provider::RedTiger => "Red Tiger",
            Provider::RelaxGaming => "Relax Gaming",
            Provider::NolimitCity => "Nolimit City",
            Provider::Playson => "Playson",
            Provider::BlueprintGaming => "Blueprint Gaming",
            Provider::ElkStudios => "ELK Studios",
            Provider::Gamomat => "Gamomat",
            Provider::InspiredGaming => "Inspired Gaming",
            Provider::PeterAndSons => "Peter & Sons",
            Provider::OneXTwoGaming => "1x2 Gaming",
            Provider::BackseatGaming => "Backseat Gaming",
            Provider::KalambaGames => "Kalamba Games",
        }
    }

    /// Path segment of the provider's listing on gamingslots.com.
    pub fn listing_path(self) -> &'static str {
        match self {
            Provider::PragmaticPlay => "pragmatic-play",
            Provider::NetEnt => "netent",
            Provider::PlaynGo => "playn-go",
            Provider::HacksawGaming => "hacksaw-gaming",
            Provider::RedTiger => "red-tiger",
            Provider::RelaxGaming => "relax-gaming",
            Provider::NolimitCity => "nolimitcity",
            Provider::Playson => "playson",
            Provider::BlueprintGaming => "blueprint-gaming",
            Provider::ElkStudios => "elk-studios",
            Provider::Gamomat => "gamomat",
            Provider::InspiredGaming => "inspired-gaming",
            Provider::PeterAndSons => "peter-sons",
            Provider::OneXTwoGaming => "1x2gaming",
            Provider::BackseatGaming => "backseat-gaming",
            Provider::KalambaGames => "kalamba-games",
        }
    }

    /// Alternate spellings, compared after slugging with hyphens removed.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Provider::PragmaticPlay => &["pragmatic", "pragmaticplay"],
            Provider::NetEnt => &["netent", "netentertainment"],
            Provider::PlaynGo => &["playngo", "playandgo", "playngogaming"],
            Provider::HacksawGaming => &["hacksaw", "hacksawgaming"],
            Provider::RedTiger => &["redtiger", "redtigergaming"],
            Provider::RelaxGaming => &["relax", "relaxgaming"],
            Provider::NolimitCity => &["nolimit", "nolimitcity"],
            Provider::Playson => &["playson"],
            Provider::BlueprintGaming => &["blueprint", "blueprintgaming"],
            Provider::ElkStudios => &["elk", "elkstudios"],
            Provider::Gamomat => &["gamomat"],
            Provider::InspiredGaming => &["inspired", "inspiredgaming", "inspiredentertainment"],
            Provider::PeterAndSons => &["petersons", "peterandsons"],
            Provider::OneXTwoGaming => &["1x2", "1x2gaming", "1x2network"],
            Provider::BackseatGaming => &["backseat", "backseatgaming"],
            Provider::KalambaGames => &["kalamba", "kalambagames"],
        }
    }

    /// Slug used as the catalog key prefix (`netent`, `playn-go`, ...).
    pub fn key_prefix(self) -> String {
        normalize_key(self.display_name())
    }

    /// Prefixes found on image files written before keys were normalized.
    fn legacy_prefixes(self) -> &'static [&'static str] {
        match self {
            Provider::PragmaticPlay => &["pragmatic"],
            Provider::NolimitCity => &["nolimitcity"],
            Provider::BlueprintGaming => &["blueprintgaming"],
            Provider::InspiredGaming => &["inspiredgaming"],
            Provider::PeterAndSons => &["petersons"],
            Provider::OneXTwoGaming => &["1x2gaming"],
            _ => &[],
        }
    }

    /// Every key prefix this provider's files may carry, current one first.
    pub fn key_prefixes(self) -> Vec<String> {
        let mut prefixes = vec![self.key_prefix()];
        for legacy in self.legacy_prefixes() {
            if !prefixes.iter().any(|p| p == legacy) {
                prefixes.push(legacy.to_string());
            }
        }
        let compact = self.key_prefix().replace('-', "");
        if !prefixes.contains(&compact) {
            prefixes.push(compact);
        }
        prefixes
    }

    /// Resolve any known spelling to its provider.
    pub fn resolve(name: &str) -> Option<Provider> {
        let compact = normalize_key(name).replace('-', "");
        if compact.is_empty() {
            return None;
        }
        Self::ALL.into_iter().find(|p| {
            p.aliases().contains(&compact.as_str())
                || normalize_key(p.display_name()).replace('-', "") == compact
                || p.listing_path().replace('-', "") == compact
        })
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::resolve(s).ok_or_else(|| format!("unknown provider '{s}'"))
    }
}
