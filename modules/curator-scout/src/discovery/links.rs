//! Outbound link filtering and seed URL construction.

use std::collections::HashSet;

use curator_common::{sanitize_url, LinkRef};

const SKIP_PREFIXES: &[&str] = &["mailto:", "tel:", "javascript:", "#", "data:"];

const SKIP_EXTENSIONS: &[&str] = &[
    ".css", ".js", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".woff", ".woff2", ".ico", ".webp",
    ".mp3", ".mp4", ".pdf", ".zip",
];

/// Keep the content-worthy links from a detail page.
///
/// Filters by scheme and file extension, strips tracking parameters and
/// deduplicates by the sanitized URL. Order is preserved.
pub fn extract_links(page_links: &[LinkRef]) -> Vec<LinkRef> {
    let mut seen = HashSet::new();
    let mut results = Vec::new();

    for link in page_links {
        let trimmed = link.url.trim();

        if SKIP_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
            continue;
        }

        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            continue;
        }

        let path_lower = trimmed.split('?').next().unwrap_or(trimmed).to_lowercase();
        if SKIP_EXTENSIONS.iter().any(|ext| path_lower.ends_with(ext)) {
            continue;
        }

        let cleaned = sanitize_url(trimmed);
        if seen.insert(cleaned.clone()) {
            results.push(LinkRef::new(link.title.trim(), cleaned));
        }
    }

    results
}

/// Seed listing URL for a run: `base` with keywords appended as `q`.
pub fn seed_url(base: &str, keywords: &[String]) -> String {
    let terms: Vec<&str> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();
    if terms.is_empty() {
        return base.to_string();
    }
    match url::Url::parse(base) {
        Ok(mut parsed) => {
            parsed.query_pairs_mut().append_pair("q", &terms.join(" "));
            parsed.to_string()
        }
        Err(_) => base.to_string(),
    }
}
