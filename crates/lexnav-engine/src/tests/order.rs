use lexnav_cache::MemoryCache;
use lexnav_core::{
  config::{NavigationConfig, ReindexStrategy, UntaggedFlush},
  node::{ContentKind, ContentRef, DivisionType, NewDivision, NodeStatus},
  statute::NewStatute,
  store::StatuteStore,
};

use super::{division, engine, engine_with, flaky::flaky_engine, flat_statute, provision, section, statute};
use crate::Error;

// ─── calculate_order_index ───────────────────────────────────────────────────

#[tokio::test]
async fn append_starts_at_gap_and_follows_last_index() {
  let e = engine().await;
  let s = statute(&e, "act").await;

  let first = e.indices().calculate_order_index(&s, ContentKind::Division, None, None).await.unwrap();
  assert_eq!(first, 100);

  division(&e, &s, "d1", None, 1, Some(300)).await;
  let next = e.indices().calculate_order_index(&s, ContentKind::Provision, None, None).await.unwrap();
  assert_eq!(next, 400);
}

#[tokio::test]
async fn last_index_counts_inactive_nodes() {
  let e = engine().await;
  let s = statute(&e, "act").await;
  let d = division(&e, &s, "d1", None, 1, Some(700)).await;
  e.store().set_status(ContentRef::Division(d.id), NodeStatus::Repealed).await.unwrap();

  let next = e.indices().calculate_order_index(&s, ContentKind::Division, None, None).await.unwrap();
  assert_eq!(next, 800);
}

#[tokio::test]
async fn insertion_takes_the_midpoint() {
  let e = engine().await;
  let s = statute(&e, "act").await;
  division(&e, &s, "a", None, 1, Some(100)).await;
  division(&e, &s, "b", None, 2, Some(300)).await;

  let idx = e
    .indices()
    .calculate_order_index(&s, ContentKind::Division, None, Some(100))
    .await
    .unwrap();
  assert_eq!(idx, 200);

  // Nothing after the anchor: behave like an append relative to it.
  let tail = e
    .indices()
    .calculate_order_index(&s, ContentKind::Division, None, Some(300))
    .await
    .unwrap();
  assert_eq!(tail, 400);
}

#[tokio::test]
async fn exhausted_gap_reindexes_then_inserts_after_the_anchor() {
  let e = engine().await;
  let s = statute(&e, "act").await;
  let a = division(&e, &s, "a", None, 1, Some(100)).await;
  let b = division(&e, &s, "b", None, 2, Some(101)).await;

  let idx = e
    .indices()
    .calculate_order_index(&s, ContentKind::Division, None, Some(100))
    .await
    .unwrap();

  let a = e.store().get_division(a.id).await.unwrap().unwrap();
  let b = e.store().get_division(b.id).await.unwrap().unwrap();
  assert_eq!(a.order_index, Some(100));
  assert_eq!(b.order_index, Some(200));
  assert_eq!(idx, 150);
}

#[tokio::test]
async fn retry_follows_an_anchor_that_moved() {
  let e = engine().await;
  let s = statute(&e, "act").await;
  // Reading order is a, b, c but the indices are crowded at the end.
  division(&e, &s, "a", None, 1, Some(10)).await;
  division(&e, &s, "b", None, 2, Some(11)).await;
  division(&e, &s, "c", None, 3, Some(12)).await;

  // Anchor is b (11); after the reindex b sits at 200 and c at 300.
  let idx = e
    .indices()
    .calculate_order_index(&s, ContentKind::Division, None, Some(11))
    .await
    .unwrap();
  assert_eq!(idx, 250);
}

#[tokio::test]
async fn manual_strategy_refuses_exhausted_gaps() {
  let config = NavigationConfig { reindex_strategy: ReindexStrategy::Manual, ..Default::default() };
  let e = engine_with(config, MemoryCache::new()).await;
  let s = statute(&e, "act").await;
  let b = division(&e, &s, "b", None, 2, Some(101)).await;
  division(&e, &s, "a", None, 1, Some(100)).await;

  let err = e
    .indices()
    .calculate_order_index(&s, ContentKind::Division, None, Some(100))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::GapExhausted { after: 100, next: 101 }));

  let b = e.store().get_division(b.id).await.unwrap().unwrap();
  assert_eq!(b.order_index, Some(101));
}

// ─── reindex_statute ─────────────────────────────────────────────────────────

#[tokio::test]
async fn reindex_is_idempotent() {
  let e = engine().await;
  let s = statute(&e, "act").await;
  let p1 = division(&e, &s, "part-1", None, 1, Some(5)).await;
  provision(&e, section(&s, "s1").in_division(p1.id), Some(3)).await;
  division(&e, &s, "part-2", None, 2, None).await;

  let first = e.indices().reindex_statute(&s, false).await;
  assert!(first.succeeded());
  assert_eq!(first.total_items, 3);
  assert_eq!(first.divisions_updated, 2);
  assert_eq!(first.provisions_updated, 1);

  let second = e.indices().reindex_statute(&s, false).await;
  let indices = |r: &crate::ReindexReport| r.changes.iter().map(|c| c.new_index).collect::<Vec<_>>();
  assert_eq!(indices(&first), indices(&second));
  assert_eq!(indices(&second), [100, 200, 300]);
  assert!(second.changes.iter().all(|c| c.is_unchanged()));
}

#[tokio::test]
async fn dry_run_reports_without_writing() {
  let e = engine().await;
  let s = statute(&e, "act").await;
  let d = division(&e, &s, "d", None, 1, Some(42)).await;
  let p = provision(&e, section(&s, "s").in_division(d.id), None).await;

  let dry = e.indices().reindex_statute(&s, true).await;
  assert!(dry.dry_run);
  assert_eq!(dry.divisions_updated + dry.provisions_updated, 0);
  assert_eq!(e.store().get_division(d.id).await.unwrap().unwrap().order_index, Some(42));
  assert_eq!(e.store().get_provision(p.id).await.unwrap().unwrap().order_index, None);

  let real = e.indices().reindex_statute(&s, false).await;
  let new = |r: &crate::ReindexReport| r.changes.iter().map(|c| (c.id, c.new_index)).collect::<Vec<_>>();
  assert_eq!(new(&dry), new(&real));
  assert_eq!(dry.changes[1].old_index, None);
}

#[tokio::test]
async fn committed_reindex_flushes_statute_cache() {
  let e = engine().await;
  let s = flat_statute(&e, 3).await;
  e.resolver().position_metadata(&s, 200).await.unwrap();
  e.resolver().total_items(&s).await.unwrap();
  assert_eq!(e.cache().len(), 2);

  e.indices().reindex_statute(&s, true).await;
  assert_eq!(e.cache().len(), 2);

  e.indices().reindex_statute(&s, false).await;
  assert!(e.cache().is_empty());
}

#[tokio::test]
async fn enumerated_flush_forgets_stale_positions() {
  let config = NavigationConfig {
    untagged_flush: UntaggedFlush::EnumerateKeys,
    ..Default::default()
  };
  let e = engine_with(config, MemoryCache::untagged()).await;
  let s = statute(&e, "act").await;
  division(&e, &s, "a", None, 1, Some(7)).await;
  division(&e, &s, "b", None, 2, Some(9)).await;
  e.resolver().position_metadata(&s, 7).await.unwrap();
  e.resolver().position_metadata(&s, 9).await.unwrap();
  assert_eq!(e.cache().len(), 3);

  let report = e.indices().reindex_statute(&s, false).await;
  assert!(report.succeeded());
  assert!(e.cache().is_empty());
}

// ─── validate_indices ────────────────────────────────────────────────────────

#[tokio::test]
async fn validation_flags_missing_and_duplicate_indices() {
  let e = engine().await;
  let s = statute(&e, "act").await;
  division(&e, &s, "a", None, 1, Some(100)).await;
  division(&e, &s, "b", None, 2, Some(100)).await;
  division(&e, &s, "c", None, 3, None).await;

  let report = e.indices().validate_indices(&s).await.unwrap();
  assert!(!report.valid);
  assert_eq!(report.statistics.total_items, 3);
  assert_eq!(report.statistics.items_without_index, 1);
  assert_eq!(report.duplicates.unwrap().get(&100), Some(&2));
  assert!(report.issues.iter().any(|i| i == "1 items missing order_index"));
  assert_eq!(report.recommendation, "Reindexing recommended");
  assert!(report.repair.is_none());
}

#[tokio::test]
async fn auto_repair_reindexes_invalid_statutes() {
  let config = NavigationConfig { auto_repair: true, ..Default::default() };
  let e = engine_with(config, MemoryCache::new()).await;
  let s = statute(&e, "act").await;
  division(&e, &s, "a", None, 1, Some(100)).await;
  division(&e, &s, "b", None, 2, Some(101)).await;

  let report = e.indices().validate_indices(&s).await.unwrap();
  assert!(!report.valid);
  let repair = report.repair.expect("repair attached");
  assert_eq!(repair.divisions_updated, 1);

  let again = e.indices().validate_indices(&s).await.unwrap();
  assert!(again.valid);
  assert_eq!(again.recommendation, "No issues found");
  assert!(again.repair.is_none());
}

#[tokio::test]
async fn total_items_counts_active_indexed_nodes() {
  let e = engine().await;
  let s = flat_statute(&e, 3).await;
  division(&e, &s, "unindexed", None, 9, None).await;
  let gone = division(&e, &s, "gone", None, 10, Some(900)).await;
  e.store().set_status(ContentRef::Division(gone.id), NodeStatus::Repealed).await.unwrap();

  assert_eq!(e.indices().total_items(&s).await.unwrap(), 3);
}

#[tokio::test]
async fn failed_reindex_is_reported_and_changes_nothing() {
  let e = flaky_engine(NavigationConfig::default(), MemoryCache::new()).await;
  let s = e.store().insert_statute(NewStatute::new("act", "Act")).await.unwrap();
  let mut ids = Vec::new();
  for (slug, index) in [("a", 100), ("b", 101), ("c", 900)] {
    let input = NewDivision::new(s.id, slug, DivisionType::Part, slug).indexed(index);
    ids.push(e.store().insert_division(input).await.unwrap().id);
  }
  e.store().fail_reindex();

  let report = e.indices().reindex_statute(&s, false).await;
  assert!(!report.succeeded());
  assert!(report.error.as_deref().is_some_and(|m| m.contains("rolled back")));
  assert!(report.changes.is_empty());
  assert_eq!((report.divisions_updated, report.provisions_updated), (0, 0));

  let mut stored = Vec::new();
  for id in &ids {
    stored.push(e.store().get_division(*id).await.unwrap().unwrap().order_index);
  }
  assert_eq!(stored, [Some(100), Some(101), Some(900)]);

  let err = e
    .indices()
    .calculate_order_index(&s, ContentKind::Division, None, Some(100))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ReindexFailed(_)));
}
