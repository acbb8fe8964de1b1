//! Filters out recognized strings that should never reach the translator:
//! watermarks, site URLs, ad markup, tracking identifiers.

use regex::Regex;
use std::sync::LazyLock;

const MAX_FILTERED_LEN: usize = 200;

static SKIP_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Watermarks and aggregator domains
        r"(?i)(manhwa|webtoon|toon|manga)\d*\.(com|net|org|cc)",
        r"(?i)https?://[a-z0-9.-]+\.[a-z]{2,}",
        r"(?i)^(https?|ftp|mailto)://\S*",
        r"(?i)[a-z0-9]+\.kr",
        // Copyright boilerplate
        r"(?i)copyright",
        r"(?i)all rights reserved",
        r"(?i)watermark",
        // Ad markup and networks
        r"(?i)\[ad\]|ad:",
        r"(?i)data-ad-|data-ads",
        r"(?i)ads?[-_](container|wrapper|frame|unit)",
        r"(?i)(doubleclick|googleadservices|adform)\.",
        r"(?i)(banner|leaderboard|skyscraper)",
        r"(?i)(sponsor|promoted|recommended)",
        // Tracking artifacts
        r"(?i)[?&](utm_|ref=|source=|campaign=)",
        r"(?i)(utm|ref|source)=",
        r"(?i)^1x1\.gif$",
        r"(?i)pixel\.gif(\?.*)?$",
        r"(?i)transparent\.gif(\?.*)?$",
        // Opaque identifiers
        r"(?i)^[a-f0-9]{32}$",
        r"(?i)^[a-f0-9]{40}$",
        r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
        r"^[A-Z0-9_]+$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("skip pattern must compile"))
    .collect()
});

/// True when the text is a watermark/ad/identifier rather than content.
/// Long strings are never skipped; real dialogue can mention a URL.
pub fn should_skip_translation(text: &str) -> bool {
    if text.chars().count() > MAX_FILTERED_LEN {
        return false;
    }
    SKIP_PATTERNS.iter().any(|pattern| pattern.is_match(text))
}
