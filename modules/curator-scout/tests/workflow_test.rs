//! End-to-end runs of the curator workflow against mock collaborators.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use curator_cache::{CacheStore, MemoryCache};
use curator_common::{Criteria, CuratorConfig, CuratorError, LinkRef, ScoreSource};
use curator_scout::notify::{ChannelBackend, Notification, NotifyBackend, Stage};
use curator_scout::pipeline::replay;
use curator_scout::testing::{
    numbered_pages, page, test_config, MockCatalog, MockEnricher, MockExtractor, MockScorer,
};
use curator_scout::traits::Enricher;
use curator_scout::{Curator, WorkflowDeps};

fn space_criteria() -> Criteria {
    Criteria {
        target_tags: vec!["space".into()],
        keywords: vec!["space".into()],
        ..Criteria::default()
    }
}

fn catalog_with(n: usize) -> MockCatalog {
    let (links, pages) = numbered_pages(n);
    pages
        .into_iter()
        .fold(MockCatalog::new().on_listing(links), |catalog, p| catalog.on_page(p))
}

fn curator(catalog: MockCatalog, scorer: MockScorer, config: CuratorConfig) -> Curator {
    Curator::new(
        WorkflowDeps::builder()
            .catalog(Arc::new(catalog))
            .extractor(Arc::new(MockExtractor::returning(space_criteria())))
            .scorer(Arc::new(scorer))
            .config(config)
            .build(),
    )
}

fn event_types(outcome: &curator_scout::WorkflowOutcome) -> Vec<String> {
    outcome.journal.iter().map(|e| e.event_type.clone()).collect()
}

#[tokio::test]
async fn empty_listing_finalizes_with_nothing() {
    let outcome = curator(MockCatalog::new(), MockScorer::new(), test_config())
        .run("space adventures")
        .await
        .unwrap();

    assert!(outcome.state.completed);
    assert!(outcome.recommendations().is_empty());
    assert!(outcome.state.last_error.is_none());
    assert_eq!(
        event_types(&outcome),
        vec![
            "workflow:run_started",
            "workflow:criteria_extracted",
            "workflow:items_discovered",
            "workflow:finalized",
        ]
    );
}

#[tokio::test]
async fn strong_batch_passes_gate_and_finalizes_directly() {
    let mut config = test_config();
    config.discovery.batch_size = 12;
    let scorer = MockScorer::new()
        .with_default(0.3)
        .with_score("Item 1", 0.9)
        .with_score("Item 4", 0.8)
        .with_score("Item 7", 0.75)
        .with_score("Item 10", 0.95);

    let outcome = curator(catalog_with(12), scorer, config).run("space").await.unwrap();

    assert!(outcome.state.gate_passed);
    assert_eq!(outcome.state.high_confidence_count, 4);
    assert_eq!(outcome.state.attempts.current, 0);
    assert_eq!(outcome.state.candidates.len(), 4);
    let titles: Vec<_> = outcome
        .recommendations()
        .iter()
        .map(|e| e.item.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Item 10", "Item 1", "Item 4", "Item 7"]);
    assert!(!event_types(&outcome).contains(&"workflow:criteria_widened".to_string()));
}

#[tokio::test]
async fn failed_gates_stop_at_max_attempts() {
    let scorer = MockScorer::new().with_default(0.5);
    let outcome = curator(catalog_with(30), scorer, test_config())
        .run("space")
        .await
        .unwrap();

    let widenings = event_types(&outcome)
        .iter()
        .filter(|t| *t == "workflow:criteria_widened")
        .count();
    assert_eq!(widenings, 3);
    assert_eq!(outcome.state.attempts.current, 3);
    assert!(outcome.state.completed);
    assert!(outcome.recommendations().is_empty());
    assert_eq!(outcome.stats().batches_evaluated, 3);
}

#[tokio::test]
async fn accumulated_candidates_end_search_early() {
    // Neither batch passes the gate on its own, but together they reach the
    // candidate floor.
    let scorer = MockScorer::new()
        .with_default(0.2)
        .with_score("Item 0", 0.9)
        .with_score("Item 1", 0.9)
        .with_score("Item 10", 0.9);

    let outcome = curator(catalog_with(30), scorer, test_config())
        .run("space")
        .await
        .unwrap();

    assert_eq!(outcome.state.candidates.len(), 3);
    assert_eq!(outcome.state.attempts.current, 2);
    assert_eq!(outcome.recommendations().len(), 3);
}

#[tokio::test]
async fn links_are_never_fetched_twice() {
    // A small web where every page links back to the others.
    let urls = [
        "https://catalog.local/a",
        "https://catalog.local/b",
        "https://catalog.local/c",
        "https://catalog.local/d",
    ];
    let mut catalog = MockCatalog::new().on_listing(vec![
        LinkRef::new("A", urls[0]),
        LinkRef::new("B", urls[1]),
    ]);
    for (i, url) in urls.iter().enumerate() {
        let others: Vec<&str> = urls.iter().copied().filter(|u| u != url).collect();
        catalog = catalog.on_page(page(url, &format!("Page {i}"), &["space"], &others));
    }
    let fetches = catalog.fetch_log();
    let mut config = test_config();
    config.discovery.round_size = 2;
    config.discovery.batch_size = 2;

    let outcome = curator(catalog, MockScorer::new().with_default(0.1), config)
        .run("space")
        .await
        .unwrap();

    let fetched = fetches.lock().unwrap().clone();
    let unique: HashSet<_> = fetched.iter().collect();
    assert_eq!(fetched.len(), unique.len());
    assert_eq!(unique.len(), 4);
    for item in &outcome.state.processed {
        assert!(outcome.state.seen().contains(&item.source_url));
    }
}

#[tokio::test]
async fn broken_pages_are_skipped() {
    let catalog = MockCatalog::new()
        .on_listing(vec![
            LinkRef::new("Good", "https://catalog.local/good"),
            LinkRef::new("Broken", "https://catalog.local/broken"),
        ])
        .on_page(page("https://catalog.local/good", "Good", &["space"], &[]));

    let outcome = curator(catalog, MockScorer::new(), test_config())
        .run("space")
        .await
        .unwrap();

    assert_eq!(outcome.state.processed.len(), 1);
    assert_eq!(outcome.stats().fetch_failures, 1);
    assert!(outcome.state.completed);
}

#[tokio::test]
async fn scorer_failures_use_heuristic() {
    let scorer = MockScorer::new().with_default(0.9).failing_on("Item 2");
    let outcome = curator(catalog_with(5), scorer, test_config())
        .run("space")
        .await
        .unwrap();

    let fallback = outcome
        .state
        .last_batch
        .iter()
        .find(|e| e.item.title == "Item 2")
        .unwrap();
    assert_eq!(fallback.source, ScoreSource::Heuristic);
    assert_eq!(outcome.stats().fallback_scores, 1);
}

#[tokio::test]
async fn criteria_extraction_failure_is_fatal() {
    let deps = WorkflowDeps::builder()
        .catalog(Arc::new(catalog_with(3)))
        .extractor(Arc::new(MockExtractor::failing()))
        .scorer(Arc::new(MockScorer::new()))
        .config(test_config())
        .build();

    let err = Curator::new(deps).run("space").await.unwrap_err();
    assert!(matches!(err, CuratorError::CriteriaExtraction(_)));
}

/// Cancels the run as soon as discovery reports its first item.
struct CancelOnFirstItem(CancellationToken);

#[async_trait]
impl NotifyBackend for CancelOnFirstItem {
    async fn send(&self, notification: Notification) -> anyhow::Result<()> {
        if matches!(notification, Notification::ItemFound { .. }) {
            self.0.cancel();
        }
        Ok(())
    }
}

#[tokio::test]
async fn cancellation_ends_run_between_stages() {
    let cancel = CancellationToken::new();
    let scorer = Arc::new(MockScorer::new());
    let deps = WorkflowDeps::builder()
        .catalog(Arc::new(catalog_with(5)))
        .extractor(Arc::new(MockExtractor::returning(space_criteria())))
        .scorer(scorer.clone())
        .notifier(Arc::new(CancelOnFirstItem(cancel.clone())))
        .config(test_config())
        .build();

    let err = Curator::new(deps)
        .run_with_cancel("space", cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, CuratorError::Cancelled));
    assert_eq!(scorer.calls(), 0, "evaluation never started");
}

#[tokio::test]
async fn warm_cache_skips_fetching() {
    let cache = Arc::new(MemoryCache::new());
    let (links, _) = numbered_pages(6);

    let first = Curator::new(
        WorkflowDeps::builder()
            .catalog(Arc::new(catalog_with(6)))
            .extractor(Arc::new(MockExtractor::returning(space_criteria())))
            .scorer(Arc::new(MockScorer::new()))
            .cache(cache.clone())
            .config(test_config())
            .build(),
    );
    first.run("space").await.unwrap();
    assert!(cache.stats().await.count >= 6);

    // Same listing, no pages registered: every fetch would fail.
    let cold_catalog = MockCatalog::new().on_listing(links);
    let fetches = cold_catalog.fetch_log();
    let second = Curator::new(
        WorkflowDeps::builder()
            .catalog(Arc::new(cold_catalog))
            .extractor(Arc::new(MockExtractor::returning(space_criteria())))
            .scorer(Arc::new(MockScorer::new()))
            .cache(cache.clone())
            .config(test_config())
            .build(),
    );
    let outcome = second.run("space").await.unwrap();

    assert!(fetches.lock().unwrap().is_empty());
    assert_eq!(outcome.state.processed.len(), 6);
    assert_eq!(outcome.stats().cache_hits, 6);
}

#[tokio::test]
async fn warm_run_explores_the_same_pages_as_cold_run() {
    let cache = Arc::new(MemoryCache::new());
    let listing = vec![LinkRef::new("A", "https://catalog.local/a")];
    let full_catalog = MockCatalog::new()
        .on_listing(listing.clone())
        .on_page(page(
            "https://catalog.local/a",
            "A",
            &["space"],
            &["https://catalog.local/b", "https://catalog.local/c"],
        ))
        .on_page(page("https://catalog.local/b", "B", &["space"], &[]))
        .on_page(page("https://catalog.local/c", "C", &["space"], &[]));
    let run_with = |catalog: MockCatalog| {
        Curator::new(
            WorkflowDeps::builder()
                .catalog(Arc::new(catalog))
                .extractor(Arc::new(MockExtractor::returning(space_criteria())))
                .scorer(Arc::new(MockScorer::new().with_default(0.1)))
                .cache(cache.clone())
                .config(test_config())
                .build(),
        )
    };

    let cold = run_with(full_catalog).run("space").await.unwrap();

    // Listing only: every page has to come from the cache.
    let listing_only = MockCatalog::new().on_listing(listing);
    let fetches = listing_only.fetch_log();
    let warm = run_with(listing_only).run("space").await.unwrap();

    let sources = |outcome: &curator_scout::WorkflowOutcome| -> Vec<(String, String)> {
        outcome
            .state
            .processed
            .iter()
            .map(|p| (p.item.title.clone(), p.provenance.to_string()))
            .collect()
    };
    assert_eq!(cold.state.processed.len(), 3);
    assert_eq!(sources(&warm), sources(&cold));
    assert_eq!(warm.stats().cache_hits, 3);
    assert!(fetches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn journal_replay_rebuilds_final_state() {
    let scorer = MockScorer::new()
        .with_default(0.4)
        .with_score("Item 3", 0.9)
        .with_score("Item 12", 0.8);
    let config = test_config();
    let outcome = curator(catalog_with(25), scorer, config.clone())
        .run("space")
        .await
        .unwrap();

    let rebuilt = replay("space", &config, &outcome.journal).unwrap();
    assert_eq!(rebuilt, outcome.state);
}

#[tokio::test]
async fn notifications_follow_stage_order() {
    let (backend, mut rx) = ChannelBackend::new();
    let deps = WorkflowDeps::builder()
        .catalog(Arc::new(catalog_with(4)))
        .extractor(Arc::new(MockExtractor::returning(space_criteria())))
        .scorer(Arc::new(MockScorer::new().with_default(0.9)))
        .notifier(Arc::new(backend))
        .config(test_config())
        .build();
    let curator = Curator::new(deps);
    curator.run("space").await.unwrap();
    drop(curator);

    let mut received = Vec::new();
    while let Some(n) = rx.recv().await {
        received.push(n);
    }
    assert_eq!(
        received.first(),
        Some(&Notification::StageStarted {
            stage: Stage::CriteriaExtraction
        })
    );
    assert!(matches!(
        received.last(),
        Some(Notification::FinalResult { recommendations }) if recommendations.len() == 4
    ));
    let found = received
        .iter()
        .filter(|n| matches!(n, Notification::ItemFound { .. }))
        .count();
    assert_eq!(found, 4);
}

#[tokio::test]
async fn enrichment_budget_resets_per_run() {
    let enricher = Arc::new(MockEnricher::new());
    let mut config = test_config();
    config.enrichment.max_calls = 2;
    let deps = WorkflowDeps::builder()
        .catalog(Arc::new(catalog_with(4)))
        .extractor(Arc::new(MockExtractor::returning(space_criteria())))
        .scorer(Arc::new(MockScorer::new().with_default(0.9)))
        .enricher(Some(enricher.clone() as Arc<dyn Enricher>))
        .config(config)
        .build();
    let curator = Curator::new(deps);

    let first = curator.run("space").await.unwrap();
    assert_eq!(first.stats().enriched_items, 2);
    let second = curator.run("space").await.unwrap();
    assert_eq!(second.stats().enriched_items, 2);
    assert_eq!(enricher.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn overlapping_runs_keep_separate_enrichment_budgets() {
    let enricher = Arc::new(MockEnricher::stalling(Duration::from_millis(10)));
    let mut config = test_config();
    config.discovery.batch_size = 1;
    config.routing.max_attempts = 10;
    config.enrichment.max_calls = 2;
    let curator = Curator::new(
        WorkflowDeps::builder()
            .catalog(Arc::new(catalog_with(4)))
            .extractor(Arc::new(MockExtractor::returning(space_criteria())))
            .scorer(Arc::new(MockScorer::new().with_default(0.3)))
            .enricher(Some(enricher.clone() as Arc<dyn Enricher>))
            .config(config)
            .build(),
    );

    // The second run starts while the first is between its second and third batch.
    let (first, second) = tokio::join!(curator.run("space"), async {
        tokio::time::sleep(Duration::from_millis(15)).await;
        curator.run("space").await
    });
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.stats().items_evaluated, 4);
    assert_eq!(second.stats().items_evaluated, 4);
    assert_eq!(first.stats().enriched_items, 2);
    assert_eq!(second.stats().enriched_items, 2);
    assert_eq!(enricher.calls(), 4);
}
