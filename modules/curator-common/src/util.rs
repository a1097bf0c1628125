// Key normalization and URL hygiene shared by the cache and discovery.

/// Normalize a cache key: trim, lowercase, collapse runs of non-alphanumerics to `_`.
pub fn normalize_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Query keys that only identify the referrer. Matched exactly, or as a prefix
/// when they end in `_`.
const TRACKING_KEYS: &[&str] = &["utm_", "mc_", "fbclid", "gclid", "_dt", "ref", "ref_"];

fn is_tracking_key(key: &str) -> bool {
    TRACKING_KEYS.iter().any(|t| {
        if t.ends_with('_') {
            key.starts_with(t)
        } else {
            key == *t
        }
    })
}

/// Canonical form of a catalog URL for dedup: tracking query keys and the
/// fragment removed. Unparseable input comes back trimmed.
pub fn sanitize_url(url: &str) -> String {
    let trimmed = url.trim();
    let Ok(mut parsed) = url::Url::parse(trimmed) else {
        return trimmed.to_string();
    };
    let dirty = parsed.fragment().is_some()
        || parsed.query_pairs().any(|(key, _)| is_tracking_key(&key));
    if !dirty {
        return trimmed.to_string();
    }

    parsed.set_fragment(None);
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !is_tracking_key(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(kept);
    }
    parsed.to_string()
}
