//! Collaborators that run without any network or model: a JSON fixture
//! catalog, a keyword criteria extractor, the heuristic scorer, and the default
//! `Key: value` normalizer. The CLI wires these up.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use curator_common::{
    sanitize_url, AudienceClass, CatalogItem, ContentRating, Criteria, Evaluation, LinkRef,
    RawDetail,
};

use crate::evaluation::fallback_evaluation;
use crate::traits::{CatalogSource, CriteriaExtractor, ItemNormalizer, ItemScorer};

// ---------------------------------------------------------------------------
// FixtureCatalog
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    listing: Vec<LinkRef>,
    #[serde(default)]
    pages: Vec<RawDetail>,
}

/// Catalog served from a JSON file of `{ "listing": [...], "pages": [...] }`.
/// Unknown links resolve to a partial record carrying only the listed title.
#[derive(Debug, Default)]
pub struct FixtureCatalog {
    listing: Vec<LinkRef>,
    pages: HashMap<String, RawDetail>,
}

impl FixtureCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog fixture: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse catalog fixture: {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: FixtureFile = serde_json::from_str(content)?;
        let pages = file
            .pages
            .into_iter()
            .map(|page| (sanitize_url(&page.url), page))
            .collect();
        Ok(Self {
            listing: file.listing,
            pages,
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[async_trait]
impl CatalogSource for FixtureCatalog {
    async fn list_initial_links(&self, seed_url: &str) -> Result<Vec<LinkRef>> {
        debug!(seed_url, listed = self.listing.len(), "Fixture listing");
        Ok(self.listing.clone())
    }

    async fn fetch_details(&self, link: &LinkRef) -> Result<RawDetail> {
        match self.pages.get(&sanitize_url(&link.url)) {
            Some(page) => Ok(page.clone()),
            None => Ok(RawDetail {
                url: link.url.clone(),
                title: link.title.clone(),
                ..RawDetail::default()
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// KeywordCriteriaExtractor
// ---------------------------------------------------------------------------

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9][a-z0-9'-]*").expect("valid regex"));

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "any", "anything", "are", "be", "book", "books", "can", "film", "films",
    "find", "for", "from", "good", "great", "i", "i'd", "i'm", "in", "is", "it", "like", "looking",
    "me", "movie", "movies", "my", "of", "on", "or", "our", "please", "recommend", "show", "shows",
    "some", "something", "that", "the", "things", "to", "want", "watch", "we", "with", "would",
    "you",
];

const NEGATORS: &[&str] = &["no", "not", "without", "avoid", "except", "skip"];

const TAG_ALIASES: &[(&str, &str)] = &[
    ("sci-fi", "science-fiction"),
    ("scifi", "science-fiction"),
    ("cartoons", "animation"),
    ("animated", "animation"),
    ("scary", "horror"),
    ("funny", "comedy"),
    ("robot", "robots"),
];

fn audience_word(token: &str) -> Option<AudienceClass> {
    match token {
        "kid" | "kids" | "child" | "children" | "toddler" | "toddlers" => {
            Some(AudienceClass::Children)
        }
        "family" => Some(AudienceClass::Family),
        "teen" | "teens" | "teenager" | "teenagers" => Some(AudienceClass::Teen),
        "adult" | "adults" | "mature" => Some(AudienceClass::Adult),
        _ => None,
    }
}

fn canonical_tag(token: &str) -> String {
    TAG_ALIASES
        .iter()
        .find(|(alias, _)| *alias == token)
        .map(|(_, tag)| tag.to_string())
        .unwrap_or_else(|| token.to_string())
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

/// Rule-based request interpreter. Negators exclude the next term, `about`
/// marks a preferred theme, audience words set the audience.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordCriteriaExtractor;

impl KeywordCriteriaExtractor {
    pub fn parse(request: &str) -> Result<Criteria> {
        let lowered = request.to_lowercase();
        let tokens: Vec<&str> = TOKEN_RE.find_iter(&lowered).map(|m| m.as_str()).collect();
        if tokens.is_empty() {
            bail!("request contains no searchable terms");
        }

        let mut criteria = Criteria::default();
        let mut negate_next = false;
        let mut theme_next = false;
        for token in tokens {
            if NEGATORS.contains(&token) {
                negate_next = true;
                continue;
            }
            if token == "about" {
                theme_next = true;
                continue;
            }
            if let Some(audience) = audience_word(token) {
                criteria.audience = audience;
                continue;
            }
            if STOPWORDS.contains(&token) {
                continue;
            }

            let tag = canonical_tag(token);
            if negate_next {
                push_unique(&mut criteria.excluded_tags, tag);
            } else if theme_next {
                push_unique(&mut criteria.preferred_themes, tag);
            } else {
                push_unique(&mut criteria.target_tags, tag);
            }
            negate_next = false;
            theme_next = false;
        }

        criteria.require_suitable = matches!(
            criteria.audience,
            AudienceClass::Children | AudienceClass::Family | AudienceClass::Teen
        );
        criteria.keywords = criteria.target_tags.clone();
        Ok(criteria)
    }
}

#[async_trait]
impl CriteriaExtractor for KeywordCriteriaExtractor {
    async fn extract(&self, request: &str) -> Result<Criteria> {
        Self::parse(request)
    }
}

// ---------------------------------------------------------------------------
// HeuristicScorer
// ---------------------------------------------------------------------------

/// Scores with the deterministic fallback heuristic.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicScorer;

#[async_trait]
impl ItemScorer for HeuristicScorer {
    async fn score(&self, item: &CatalogItem, criteria: &Criteria) -> Result<Evaluation> {
        Ok(fallback_evaluation(item, criteria))
    }
}

// ---------------------------------------------------------------------------
// DefaultNormalizer
// ---------------------------------------------------------------------------

static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z ]*?)\s*:\s*(.+?)\s*$").expect("valid regex")
});

fn split_list(value: &str) -> Vec<String> {
    value
        .split([',', ';', '|'])
        .map(|part| part.trim().to_lowercase())
        .filter(|part| !part.is_empty())
        .collect()
}

fn parse_rating(value: &str) -> Option<f32> {
    let number = value.split('/').next()?.trim();
    number
        .parse::<f32>()
        .ok()
        .filter(|r| r.is_finite())
        .map(|r| r.clamp(0.0, 10.0))
}

/// Reads `Key: value` lines from the page body. Unknown keys are ignored and
/// missing fields keep their defaults.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNormalizer;

impl ItemNormalizer for DefaultNormalizer {
    fn normalize(&self, raw: &RawDetail) -> CatalogItem {
        let mut item = CatalogItem::new(raw.title.trim());
        item.year = raw.year;
        item.description = raw.description.clone().unwrap_or_default();
        let mut prose: Vec<&str> = Vec::new();

        for line in raw.raw_content.lines() {
            let Some(caps) = FIELD_RE.captures(line) else {
                if !line.trim().is_empty() {
                    prose.push(line.trim());
                }
                continue;
            };
            let value = &caps[2];
            match caps[1].to_lowercase().as_str() {
                "tags" | "genre" | "genres" => item.tags.extend(split_list(value)),
                "themes" | "theme" => item.themes.extend(split_list(value)),
                "rating" | "score" => {
                    if let Some(rating) = parse_rating(value) {
                        item.rating = rating;
                    }
                }
                "classification" | "rated" | "certificate" => {
                    item.classification = ContentRating::parse(value);
                }
                "creator" | "author" | "director" | "studio" => {
                    item.creator = Some(value.to_string());
                }
                "year" | "released" => {
                    if item.year.is_none() {
                        item.year = value.get(..4).and_then(|y| y.parse().ok());
                    }
                }
                "description" | "summary" | "plot" => {
                    if item.description.is_empty() {
                        item.description = value.to_string();
                    }
                }
                "title" => {
                    if item.title.is_empty() {
                        item.title = value.to_string();
                    }
                }
                _ => prose.push(line.trim()),
            }
        }

        if item.description.is_empty() && !prose.is_empty() {
            item.description = prose.join(" ");
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_targets_exclusions_and_audience() {
        let criteria =
            KeywordCriteriaExtractor::parse("Sci-fi adventure movies for kids, no horror please")
                .unwrap();
        assert_eq!(criteria.target_tags, vec!["science-fiction", "adventure"]);
        assert_eq!(criteria.excluded_tags, vec!["horror"]);
        assert_eq!(criteria.audience, AudienceClass::Children);
        assert!(criteria.require_suitable);
        assert_eq!(criteria.keywords, criteria.target_tags);
    }

    #[test]
    fn about_marks_preferred_theme() {
        let criteria = KeywordCriteriaExtractor::parse("drama about friendship").unwrap();
        assert_eq!(criteria.target_tags, vec!["drama"]);
        assert_eq!(criteria.preferred_themes, vec!["friendship"]);
        assert!(!criteria.require_suitable);
    }

    #[test]
    fn blank_request_is_an_error() {
        assert!(KeywordCriteriaExtractor::parse("  ?! ").is_err());
    }

    #[test]
    fn normalizer_reads_fields() {
        let raw = RawDetail {
            url: "https://catalog.local/wall-e".into(),
            title: "WALL-E".into(),
            raw_content: "Year: 2008\nGenres: Animation, Science-Fiction\nRating: 8.4/10\n\
                          Rated: G\nDirector: Andrew Stanton\nThemes: loneliness; environment\n\
                          A small robot cleans up Earth."
                .into(),
            ..RawDetail::default()
        };
        let item = DefaultNormalizer.normalize(&raw);
        assert_eq!(item.year, Some(2008));
        assert_eq!(item.tags, vec!["animation", "science-fiction"]);
        assert_eq!(item.rating, 8.4);
        assert_eq!(item.classification, ContentRating::AllAges);
        assert_eq!(item.creator.as_deref(), Some("Andrew Stanton"));
        assert_eq!(item.themes, vec!["loneliness", "environment"]);
        assert_eq!(item.description, "A small robot cleans up Earth.");
        assert_eq!(item.cache_key(), "wall_e_2008");
    }

    #[test]
    fn normalizer_tolerates_empty_page() {
        let item = DefaultNormalizer.normalize(&RawDetail::default());
        assert!(item.tags.is_empty());
        assert_eq!(item.rating, 0.0);
        assert_eq!(item.classification, ContentRating::Unrated);
    }

    #[tokio::test]
    async fn fixture_catalog_serves_pages_and_partials() {
        let catalog = FixtureCatalog::from_json(
            r#"{
                "listing": [{"title": "Known", "url": "https://catalog.local/known"}],
                "pages": [{"url": "https://catalog.local/known", "title": "Known",
                           "raw_content": "Tags: space"}]
            }"#,
        )
        .unwrap();
        assert_eq!(catalog.list_initial_links("ignored").await.unwrap().len(), 1);

        let known = catalog
            .fetch_details(&LinkRef::new("Known", "https://catalog.local/known?utm_source=x"))
            .await
            .unwrap();
        assert_eq!(known.raw_content, "Tags: space");

        let unknown = catalog
            .fetch_details(&LinkRef::new("Mystery", "https://catalog.local/unknown"))
            .await
            .unwrap();
        assert_eq!(unknown.title, "Mystery");
        assert!(unknown.raw_content.is_empty());
    }

    #[test]
    fn fixture_catalog_loads_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"pages": [{{"url": "https://catalog.local/a", "title": "A", "raw_content": ""}}]}}"#
        )
        .unwrap();
        let catalog = FixtureCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.page_count(), 1);

        let err = FixtureCatalog::load(Path::new("/nonexistent/catalog.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read catalog fixture"));
    }
}
