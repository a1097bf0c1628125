use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::normalize_key;

// ---------------------------------------------------------------------------
// Catalog items
// ---------------------------------------------------------------------------

/// Content classification of a catalog item, ordered from least to most restricted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ContentRating {
    AllAges,
    Family,
    Teen,
    Mature,
    #[default]
    Unrated,
}

impl ContentRating {
    /// Lenient parse of the labels catalogs commonly use. Unknown labels map to `Unrated`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "g" | "all" | "all ages" | "all_ages" | "everyone" | "u" => ContentRating::AllAges,
            "pg" | "family" | "tv-pg" | "tv-y7" => ContentRating::Family,
            "pg-13" | "teen" | "12a" | "tv-14" => ContentRating::Teen,
            "r" | "nc-17" | "mature" | "adult" | "18" | "tv-ma" => ContentRating::Mature,
            _ => ContentRating::Unrated,
        }
    }
}

/// Normalized catalog entry. Never mutated after construction; enrichment
/// produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub title: String,
    pub year: Option<i32>,
    pub tags: Vec<String>,
    /// 0.0–10.0
    pub rating: f32,
    pub description: String,
    pub classification: ContentRating,
    pub themes: Vec<String>,
    /// Author, director or studio. Used as the secondary diversity axis.
    pub creator: Option<String>,
}

impl CatalogItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            year: None,
            tags: Vec::new(),
            rating: 0.0,
            description: String::new(),
            classification: ContentRating::Unrated,
            themes: Vec::new(),
            creator: None,
        }
    }

    /// Normalized `title_year` cache key.
    pub fn cache_key(&self) -> String {
        match self.year {
            Some(year) => normalize_key(&format!("{}_{}", self.title, year)),
            None => normalize_key(&format!("{}_unknown", self.title)),
        }
    }

    /// Lowercased tags, for case-insensitive comparisons.
    pub fn tag_set(&self) -> std::collections::HashSet<String> {
        self.tags.iter().map(|t| t.trim().to_lowercase()).collect()
    }
}

// ---------------------------------------------------------------------------
// Links & discovery
// ---------------------------------------------------------------------------

/// Discovery path a queued link came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Returned by the catalog's initial listing.
    Initial,
    /// Found on a page reached from an initial link.
    Related,
    /// Found on a page two or more hops from the seed listing.
    Recursive,
}

impl Provenance {
    /// Provenance for links extracted from a page that was itself reached via `self`.
    pub fn child(self) -> Self {
        match self {
            Provenance::Initial => Provenance::Related,
            Provenance::Related | Provenance::Recursive => Provenance::Recursive,
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::Initial => write!(f, "initial"),
            Provenance::Related => write!(f, "related"),
            Provenance::Recursive => write!(f, "recursive"),
        }
    }
}

/// A `{title, url}` pair as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRef {
    pub title: String,
    pub url: String,
}

impl LinkRef {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// A link waiting in the discovery queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedLink {
    pub url: String,
    pub title: String,
    pub provenance: Provenance,
    /// Hops from the seed listing. Seed links are at 0.
    #[serde(default)]
    pub depth: u32,
}

impl QueuedLink {
    pub fn as_link_ref(&self) -> LinkRef {
        LinkRef::new(self.title.clone(), self.url.clone())
    }
}

/// Best-effort detail record returned by the catalog. Missing fields are
/// left to the normalizer's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDetail {
    pub url: String,
    pub title: String,
    pub raw_content: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    /// Outbound links found on the page.
    #[serde(default)]
    pub links: Vec<LinkRef>,
}

/// An item that made it through discovery, with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedItem {
    pub item: CatalogItem,
    pub source_url: String,
    pub provenance: Provenance,
    pub processed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

/// Intended audience inferred from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AudienceClass {
    Children,
    Family,
    Teen,
    Adult,
    #[default]
    Any,
}

impl AudienceClass {
    /// Most restricted classification this audience may be shown.
    pub fn allows(self, rating: ContentRating) -> bool {
        match self {
            AudienceClass::Children => rating <= ContentRating::AllAges,
            AudienceClass::Family => rating <= ContentRating::Family,
            AudienceClass::Teen => rating <= ContentRating::Teen,
            AudienceClass::Adult | AudienceClass::Any => true,
        }
    }
}

/// Structured interpretation of a free-text request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    pub target_tags: Vec<String>,
    pub excluded_tags: Vec<String>,
    pub audience: AudienceClass,
    /// When set, items rated above what `audience` allows are unsuitable.
    pub require_suitable: bool,
    pub preferred_themes: Vec<String>,
    pub avoided_themes: Vec<String>,
    pub keywords: Vec<String>,
}

// ---------------------------------------------------------------------------
// Evaluations
// ---------------------------------------------------------------------------

/// Which path produced an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Scorer,
    Heuristic,
}

/// Judgment of one item against the current criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub item: CatalogItem,
    /// 0.0–1.0
    pub confidence: f64,
    pub reasoning: String,
    pub suitable: bool,
    pub source: ScoreSource,
}

impl Evaluation {
    pub fn new(item: CatalogItem, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            item,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
            suitable: true,
            source: ScoreSource::Scorer,
        }
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// What the cache keeps per key: the normalized item and the content links
/// its page carried, so a hit can feed the discovery queue like a fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPage {
    pub item: CatalogItem,
    #[serde(default)]
    pub links: Vec<LinkRef>,
}

impl CachedPage {
    pub fn new(item: CatalogItem, links: Vec<LinkRef>) -> Self {
        Self { item, links }
    }
}

impl From<CatalogItem> for CachedPage {
    fn from(item: CatalogItem) -> Self {
        Self::new(item, Vec::new())
    }
}

/// One row of the cache store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub page: CachedPage,
    pub inserted_at: DateTime<Utc>,
}

/// Aggregate view of the cache store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub count: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}
