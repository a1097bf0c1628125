//! Deterministic fallback scoring.
//!
//! Used whenever the scorer fails or times out, and by the offline scorer.
//! Pure: the same item and criteria always produce the same evaluation.

use std::collections::HashSet;

use curator_common::{CatalogItem, Criteria, Evaluation, ScoreSource};

/// Overlap credit when the criteria name no target tags.
const NEUTRAL_OVERLAP: f64 = 0.5;
const OVERLAP_WEIGHT: f64 = 0.6;
const RATING_WEIGHT: f64 = 0.4;
const PREFERRED_THEME_BONUS: f64 = 0.05;
const MAX_THEME_BONUS: f64 = 0.15;
const EXCLUDED_TAG_PENALTY: f64 = 0.3;
const AVOIDED_THEME_PENALTY: f64 = 0.15;
/// Unsuitable items never clear the default high-confidence threshold.
const UNSUITABLE_CAP: f64 = 0.4;

fn lowered(values: &[String]) -> HashSet<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

pub fn fallback_evaluation(item: &CatalogItem, criteria: &Criteria) -> Evaluation {
    let tags = item.tag_set();
    let themes = lowered(&item.themes);
    let targets = lowered(&criteria.target_tags);

    let matched = targets.intersection(&tags).count();
    let overlap = if targets.is_empty() {
        NEUTRAL_OVERLAP
    } else {
        matched as f64 / targets.len() as f64
    };
    let excluded_hits = lowered(&criteria.excluded_tags).intersection(&tags).count();
    let avoided_hits = lowered(&criteria.avoided_themes).intersection(&themes).count();
    let preferred_hits = lowered(&criteria.preferred_themes)
        .intersection(&themes)
        .count();
    let rating = (f64::from(item.rating) / 10.0).clamp(0.0, 1.0);

    let mut score = OVERLAP_WEIGHT * overlap + RATING_WEIGHT * rating;
    score += (PREFERRED_THEME_BONUS * preferred_hits as f64).min(MAX_THEME_BONUS);
    score -= EXCLUDED_TAG_PENALTY * excluded_hits as f64;
    score -= AVOIDED_THEME_PENALTY * avoided_hits as f64;

    let audience_ok =
        !criteria.require_suitable || criteria.audience.allows(item.classification);
    let suitable = excluded_hits == 0 && avoided_hits == 0 && audience_ok;
    if !suitable {
        score = score.min(UNSUITABLE_CAP);
    }

    let reasoning = format!(
        "heuristic: {matched}/{} target tags, rating {:.1}, {excluded_hits} excluded, {avoided_hits} avoided",
        targets.len(),
        item.rating
    );
    Evaluation {
        item: item.clone(),
        confidence: score.clamp(0.0, 1.0),
        reasoning,
        suitable,
        source: ScoreSource::Heuristic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_common::{AudienceClass, ContentRating};

    fn item(tags: &[&str], rating: f32) -> CatalogItem {
        let mut item = CatalogItem::new("Probe");
        item.tags = tags.iter().map(|t| t.to_string()).collect();
        item.rating = rating;
        item
    }

    fn criteria(targets: &[&str]) -> Criteria {
        Criteria {
            target_tags: targets.iter().map(|t| t.to_string()).collect(),
            ..Criteria::default()
        }
    }

    #[test]
    fn full_overlap_and_top_rating_is_confident() {
        let eval = fallback_evaluation(
            &item(&["Space", "adventure"], 10.0),
            &criteria(&["space", "adventure"]),
        );
        assert!((eval.confidence - 1.0).abs() < 1e-9);
        assert_eq!(eval.source, ScoreSource::Heuristic);
        assert!(eval.suitable);
    }

    #[test]
    fn no_targets_gives_neutral_overlap() {
        let eval = fallback_evaluation(&item(&["drama"], 5.0), &criteria(&[]));
        assert!((eval.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn excluded_tag_marks_unsuitable_and_caps() {
        let mut c = criteria(&["space"]);
        c.excluded_tags = vec!["horror".into()];
        let eval = fallback_evaluation(&item(&["space", "horror"], 9.0), &c);
        assert!(!eval.suitable);
        assert!(eval.confidence <= UNSUITABLE_CAP);
    }

    #[test]
    fn audience_restriction_applies_only_when_required() {
        let mut mature = item(&["space"], 8.0);
        mature.classification = ContentRating::Mature;
        let mut c = criteria(&["space"]);
        c.audience = AudienceClass::Children;
        assert!(fallback_evaluation(&mature, &c).suitable);

        c.require_suitable = true;
        assert!(!fallback_evaluation(&mature, &c).suitable);
    }

    #[test]
    fn scoring_is_deterministic() {
        let c = criteria(&["space", "robots"]);
        let probe = item(&["robots"], 7.3);
        assert_eq!(fallback_evaluation(&probe, &c), fallback_evaluation(&probe, &c));
    }
}
