//! Criteria widening after a failed quality gate.
//!
//! Pure and deterministic: the same criteria and attempt number always widen
//! the same way. Exclusions are never relaxed.

use std::collections::HashSet;

use tracing::info;

use curator_common::Criteria;

/// Adjacent tags tried when a search comes up short.
const TAG_NEIGHBORS: &[(&str, &[&str])] = &[
    ("adventure", &["action", "quest", "fantasy"]),
    ("animation", &["family", "cartoon"]),
    ("comedy", &["satire", "romance"]),
    ("documentary", &["history", "nature"]),
    ("drama", &["biography", "romance"]),
    ("family", &["animation", "adventure"]),
    ("fantasy", &["adventure", "fairy-tale", "magic"]),
    ("history", &["war", "biography"]),
    ("horror", &["thriller", "supernatural"]),
    ("mystery", &["detective", "thriller"]),
    ("robots", &["science-fiction", "ai"]),
    ("romance", &["drama", "comedy"]),
    ("science-fiction", &["space", "robots", "dystopia"]),
    ("space", &["science-fiction", "astronomy"]),
    ("thriller", &["mystery", "crime"]),
];

/// From this attempt on, preferred themes are promoted into target tags.
const PROMOTE_THEMES_FROM: u32 = 2;

pub fn neighbors(tag: &str) -> &'static [&'static str] {
    TAG_NEIGHBORS
        .iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, adjacent)| *adjacent)
        .unwrap_or(&[])
}

/// Widen `criteria` for search attempt `attempt` (1-based).
pub fn adapt(criteria: &Criteria, attempt: u32) -> Criteria {
    let excluded: HashSet<String> = criteria
        .excluded_tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .collect();
    let mut known: HashSet<String> = criteria
        .target_tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .collect();

    let mut additions: Vec<String> = Vec::new();
    let mut consider = |candidate: &str, additions: &mut Vec<String>| {
        let candidate = candidate.trim().to_lowercase();
        if !candidate.is_empty()
            && !excluded.contains(&candidate)
            && known.insert(candidate.clone())
        {
            additions.push(candidate);
        }
    };

    for tag in &criteria.target_tags {
        for adjacent in neighbors(&tag.trim().to_lowercase()) {
            consider(adjacent, &mut additions);
        }
    }
    if attempt >= PROMOTE_THEMES_FROM {
        for theme in &criteria.preferred_themes {
            consider(theme, &mut additions);
        }
    }

    let mut widened = criteria.clone();
    widened.target_tags.extend(additions.iter().cloned());
    for tag in &additions {
        if !widened.keywords.contains(tag) {
            widened.keywords.push(tag.clone());
        }
    }

    info!(attempt, added = ?additions, "Criteria widened");
    widened
}
