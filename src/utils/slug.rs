// src/utils/slug.rs

//! Slug derivation for catalog keys and listing URLs.

/// Byte sequences left behind when UTF-8 smart quotes were decoded as cp1252.
const MOJIBAKE_QUOTES: &[&str] = &["â€™", "â€˜", "â€œ", "â€\u{9d}", "â€"];

/// Quote-like characters removed outright rather than turned into separators.
const QUOTE_CHARS: &[char] = &[
    '\'', '"', '`', '\u{00b4}', '\u{2018}', '\u{2019}', '\u{201b}', '\u{201c}', '\u{201d}',
];

/// Canonicalize a human-readable name into a filesystem- and URL-safe slug.
///
/// Lowercases, drops apostrophes and quote characters (including mis-decoded
/// smart quotes), spells out `&` as `and`, collapses every other run of
/// non-alphanumeric characters into a single `-` and trims hyphens from both
/// ends. Only ASCII letters and digits survive.
///
/// # Examples
/// ```
/// use slotcat::utils::slug::normalize_key;
///
/// assert_eq!(normalize_key("Gonzo's Quest"), "gonzos-quest");
/// assert_eq!(normalize_key("Play'n GO"), "playn-go");
/// ```
pub fn normalize_key(name: &str) -> String {
    let mut cleaned = name.to_string();
    for seq in MOJIBAKE_QUOTES {
        cleaned = cleaned.replace(seq, "");
    }
    let cleaned = cleaned.replace('&', " and ");

    let mut slug = String::with_capacity(cleaned.len());
    let mut pending_hyphen = false;

    for c in cleaned.chars() {
        if QUOTE_CHARS.contains(&c) {
            continue;
        }
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Strip a trailing `-slot` marker used by listing URLs.
pub fn strip_slot_suffix(slug: &str) -> &str {
    slug.strip_suffix("-slot").unwrap_or(slug)
}

/// Turn a slug back into a title-cased display name.
pub fn display_name_from_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
