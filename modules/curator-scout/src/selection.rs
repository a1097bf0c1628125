//! Final top-k selection with diversity.

use std::collections::HashSet;

use tracing::debug;

use curator_common::config::SelectionConfig;
use curator_common::Evaluation;

/// Pick up to `k` recommendations from `candidates`.
///
/// Candidates are ranked by confidence (ties keep input order) and collapsed by
/// item cache key. The first `ceil(k * unconditional_ratio)` slots take the
/// best remaining candidate, except that one whose tags are all already
/// admitted yields to the best lower-ranked candidate bringing a new tag.
/// Later slots admit only candidates that add an unseen tag or creator, and
/// whatever is left is filled by rank. Output is in admission order and its
/// length is `min(k, distinct candidates)`.
pub fn select(candidates: &[Evaluation], k: usize, unconditional_ratio: f64) -> Vec<Evaluation> {
    let mut ranked: Vec<&Evaluation> = candidates.iter().collect();
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keys = HashSet::new();
    ranked.retain(|e| keys.insert(e.item.cache_key()));

    let k = k.min(ranked.len());
    let unconditional = ((k as f64) * unconditional_ratio.clamp(0.0, 1.0)).ceil() as usize;
    let unconditional = unconditional.min(k);

    let mut picks = Picks::new(&ranked);

    while picks.order.len() < unconditional {
        let Some(best) = picks.remaining().next() else {
            break;
        };
        let pick = if picks.covers_tags_of(best) {
            picks
                .remaining()
                .find(|&idx| picks.adds_tag(idx))
                .unwrap_or(best)
        } else {
            best
        };
        picks.admit(pick);
    }

    for idx in 0..ranked.len() {
        if picks.order.len() == k {
            break;
        }
        if !picks.admitted[idx] && (picks.adds_tag(idx) || picks.adds_creator(idx)) {
            picks.admit(idx);
        }
    }

    for idx in 0..ranked.len() {
        if picks.order.len() == k {
            break;
        }
        if !picks.admitted[idx] {
            picks.admit(idx);
        }
    }

    let selected: Vec<Evaluation> = picks.order.iter().map(|&idx| ranked[idx].clone()).collect();
    debug!(
        candidates = candidates.len(),
        distinct = ranked.len(),
        selected = selected.len(),
        unconditional,
        "Selection complete"
    );
    selected
}

/// Admission bookkeeping over the ranked candidates.
struct Picks<'a> {
    ranked: &'a [&'a Evaluation],
    admitted: Vec<bool>,
    order: Vec<usize>,
    used_tags: HashSet<String>,
    used_creators: HashSet<String>,
}

impl<'a> Picks<'a> {
    fn new(ranked: &'a [&'a Evaluation]) -> Self {
        Self {
            ranked,
            admitted: vec![false; ranked.len()],
            order: Vec::new(),
            used_tags: HashSet::new(),
            used_creators: HashSet::new(),
        }
    }

    /// Indices not yet admitted, best first.
    fn remaining(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.ranked.len()).filter(|&idx| !self.admitted[idx])
    }

    fn adds_tag(&self, idx: usize) -> bool {
        self.ranked[idx]
            .item
            .tag_set()
            .iter()
            .any(|t| !self.used_tags.contains(t))
    }

    /// Tagged, and every tag already admitted.
    fn covers_tags_of(&self, idx: usize) -> bool {
        !self.ranked[idx].item.tag_set().is_empty() && !self.adds_tag(idx)
    }

    fn adds_creator(&self, idx: usize) -> bool {
        self.ranked[idx]
            .item
            .creator
            .as_ref()
            .is_some_and(|c| !self.used_creators.contains(&c.trim().to_lowercase()))
    }

    fn admit(&mut self, idx: usize) {
        self.admitted[idx] = true;
        self.order.push(idx);
        self.used_tags.extend(self.ranked[idx].item.tag_set());
        if let Some(creator) = &self.ranked[idx].item.creator {
            self.used_creators.insert(creator.trim().to_lowercase());
        }
    }
}

pub fn select_with(candidates: &[Evaluation], config: &SelectionConfig) -> Vec<Evaluation> {
    select(candidates, config.k, config.unconditional_ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_common::CatalogItem;

    fn eval(title: &str, tags: &[&str], creator: Option<&str>, confidence: f64) -> Evaluation {
        let mut item = CatalogItem::new(title);
        item.tags = tags.iter().map(|t| t.to_string()).collect();
        item.creator = creator.map(str::to_string);
        Evaluation::new(item, confidence, "test")
    }

    fn titles(selected: &[Evaluation]) -> Vec<&str> {
        selected.iter().map(|e| e.item.title.as_str()).collect()
    }

    #[test]
    fn empty_candidates_select_nothing() {
        assert!(select(&[], 5, 0.6).is_empty());
    }

    #[test]
    fn fewer_candidates_than_k_returns_all() {
        let candidates = [eval("A", &["x"], None, 0.8), eval("B", &["x"], None, 0.9)];
        let picked = select(&candidates, 5, 0.6);
        assert_eq!(titles(&picked), vec!["B", "A"]);
    }

    #[test]
    fn duplicates_collapse_to_highest_confidence() {
        let picked = select(
            &[
                eval("Dune", &["space"], None, 0.8),
                eval("dune", &["space"], None, 0.95),
                eval("Solaris", &["space"], None, 0.7),
            ],
            5,
            0.6,
        );
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].confidence, 0.95);
    }

    #[test]
    fn prefix_skips_covered_tags_when_a_new_one_is_available() {
        // k = 5 -> 3 prefix slots, then diversity, then fill.
        let candidates = vec![
            eval("A", &["space"], None, 0.99),
            eval("B", &["space"], None, 0.98),
            eval("C", &["space"], None, 0.97),
            eval("D", &["space"], None, 0.96),
            eval("E", &["space"], None, 0.95),
            eval("F", &["robots"], None, 0.90),
            eval("G", &["space"], Some("New Author"), 0.85),
        ];
        let picked = select(&candidates, 5, 0.6);
        assert_eq!(titles(&picked), vec!["A", "F", "B", "G", "C"]);
    }

    #[test]
    fn first_three_slots_avoid_tag_repeats_when_tags_allow() {
        let tags = ["space", "space", "space", "robots", "drama", "space"];
        let candidates: Vec<_> = tags
            .iter()
            .enumerate()
            .map(|(i, &tag)| eval(&format!("T{i}"), &[tag], None, 0.9 - i as f64 * 0.05))
            .collect();

        let picked = select(&candidates, 5, 0.6);

        assert_eq!(picked.len(), 5);
        let first_three: HashSet<&str> = picked[..3]
            .iter()
            .map(|e| e.item.tags[0].as_str())
            .collect();
        assert_eq!(first_three, HashSet::from(["space", "robots", "drama"]));
        assert_eq!(picked[0].item.title, "T0", "best candidate always leads");
    }

    #[test]
    fn prefix_keeps_rank_when_no_new_tag_exists() {
        let candidates = vec![
            eval("A", &["space", "robots"], None, 0.9),
            eval("B", &["space"], None, 0.8),
            eval("C", &["robots"], None, 0.7),
        ];
        assert_eq!(titles(&select(&candidates, 3, 0.6)), vec!["A", "B", "C"]);
    }

    #[test]
    fn untagged_candidates_are_not_deferred() {
        let candidates = vec![
            eval("A", &["space"], None, 0.9),
            eval("Plain", &[], None, 0.8),
            eval("B", &["robots"], None, 0.7),
        ];
        assert_eq!(titles(&select(&candidates, 3, 0.6)), vec!["A", "Plain", "B"]);
    }

    #[test]
    fn diversity_admits_new_creator_after_prefix() {
        let candidates = vec![
            eval("A", &["space"], Some("Lem"), 0.99),
            eval("B", &["space"], Some("Lem"), 0.98),
            eval("C", &["space"], Some("Lem"), 0.97),
            eval("D", &["space"], Some("Lem"), 0.96),
            eval("E", &["space"], Some("Le Guin"), 0.90),
        ];
        let picked = select(&candidates, 4, 0.5);
        assert_eq!(titles(&picked), vec!["A", "B", "E", "C"]);
    }

    #[test]
    fn fill_pass_tops_up_by_rank() {
        let candidates = vec![
            eval("A", &["space"], None, 0.99),
            eval("B", &["space"], None, 0.98),
            eval("C", &["space"], None, 0.97),
            eval("D", &["space"], None, 0.96),
            eval("E", &["space"], None, 0.95),
        ];
        let picked = select(&candidates, 5, 0.6);
        assert_eq!(picked.len(), 5);
        assert_eq!(titles(&picked), vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let candidates = vec![
            eval("First", &["a"], None, 0.8),
            eval("Second", &["b"], None, 0.8),
        ];
        assert_eq!(titles(&select(&candidates, 1, 0.6)), vec!["First"]);
    }
}
