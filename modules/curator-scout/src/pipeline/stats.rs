use serde::{Deserialize, Serialize};

/// Counters for a curator run, accumulated by the reducer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub discovery_rounds: u32,
    pub links_fetched: u32,
    pub cache_hits: u32,
    pub fetch_failures: u32,
    pub links_dropped: u32,
    pub guardrail_hits: u32,
    pub items_discovered: u32,
    pub batches_evaluated: u32,
    pub items_evaluated: u32,
    pub fallback_scores: u32,
    pub enriched_items: u32,
    pub candidates_accepted: u32,
    pub criteria_widenings: u32,
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Curator Run Complete ===")?;
        writeln!(f, "Discovery rounds:   {}", self.discovery_rounds)?;
        writeln!(f, "Links fetched:      {}", self.links_fetched)?;
        writeln!(f, "Cache hits:         {}", self.cache_hits)?;
        writeln!(f, "Fetch failures:     {}", self.fetch_failures)?;
        writeln!(f, "Links dropped:      {}", self.links_dropped)?;
        writeln!(f, "Guardrail hits:     {}", self.guardrail_hits)?;
        writeln!(f, "Items discovered:   {}", self.items_discovered)?;
        writeln!(f, "\nEvaluation:")?;
        writeln!(f, "  Batches:          {}", self.batches_evaluated)?;
        writeln!(f, "  Items:            {}", self.items_evaluated)?;
        writeln!(f, "  Fallback scores:  {}", self.fallback_scores)?;
        writeln!(f, "  Enriched:         {}", self.enriched_items)?;
        writeln!(f, "  Candidates:       {}", self.candidates_accepted)?;
        if self.criteria_widenings > 0 {
            writeln!(f, "\nCriteria widenings: {}", self.criteria_widenings)?;
        }
        let lookups = (self.cache_hits + self.links_fetched).max(1);
        writeln!(
            f,
            "\nCache hit rate:     {:.0}%",
            self.cache_hits as f64 / lookups as f64 * 100.0
        )?;
        Ok(())
    }
}
