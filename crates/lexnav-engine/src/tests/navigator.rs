use lexnav_cache::MemoryCache;
use lexnav_core::{
  config::NavigationConfig,
  node::{ContentKind, NodeStatus},
  statute::Statute,
  store::StatuteStore,
};

use super::{Engine, division, engine, engine_with, flat_statute, provision, section, statute};
use crate::{Direction, Error, ErrorClass, navigator::KindFields};

fn indices<T>(items: &[T], idx: impl Fn(&T) -> i64) -> Vec<i64> { items.iter().map(idx).collect() }

/// part(100) ▸ s1(200), chapter(300) ▸ s2(400)
async fn nested_statute(e: &Engine) -> Statute {
  let s = statute(e, "nested").await;
  let part = division(e, &s, "part", None, 1, Some(100)).await;
  provision(e, section(&s, "s1").in_division(part.id), Some(200)).await;
  let chapter = division(e, &s, "chapter", Some(part.id), 1, Some(300)).await;
  provision(e, section(&s, "s2").in_division(chapter.id), Some(400)).await;
  s
}

#[tokio::test]
async fn before_returns_nearest_first_with_cursor() {
  let e = engine().await;
  let s = flat_statute(&e, 5).await;

  let page = e.navigator().load_before(&s, 300, 1, true).await.unwrap();
  assert_eq!(indices(&page.items, |i| i.order_index), [200]);
  assert_eq!(page.meta.direction, Direction::Before);
  assert!(page.meta.has_more);
  assert_eq!(page.meta.next_from_order, Some(200));

  let page = e.navigator().load_before(&s, 500, 3, true).await.unwrap();
  assert_eq!(indices(&page.items, |i| i.order_index), [400, 300, 200]);
}

#[tokio::test]
async fn exhausted_page_has_no_cursor() {
  let e = engine().await;
  let s = flat_statute(&e, 5).await;

  let page = e.navigator().load_after(&s, 300, 5, true).await.unwrap();
  assert_eq!(indices(&page.items, |i| i.order_index), [400, 500]);
  assert_eq!(page.meta.returned, 2);
  assert!(!page.meta.has_more);
  assert_eq!(page.meta.next_from_order, None);

  let empty = e.navigator().load_after(&s, 500, 5, true).await.unwrap();
  assert!(empty.items.is_empty());
  assert!(!empty.meta.has_more);
}

#[tokio::test]
async fn pages_merge_both_tables_with_child_previews() {
  let e = engine().await;
  let s = nested_statute(&e).await;

  let page = e.navigator().load_after(&s, 0, 10, true).await.unwrap();
  let kinds: Vec<_> = page.items.iter().map(|i| i.kind).collect();
  assert_eq!(kinds, [
    ContentKind::Division,
    ContentKind::Provision,
    ContentKind::Division,
    ContentKind::Provision,
  ]);
  assert_eq!(indices(&page.items, |i| i.order_index), [100, 200, 300, 400]);

  let part = &page.items[0];
  assert!(part.content.has_children);
  assert!(matches!(part.content.fields, KindFields::Division(ref f) if f.child_count == 2));
  assert_eq!(part.children.len(), 1);
  assert_eq!(part.children[0].slug, "chapter");

  let s1 = &page.items[1];
  assert!(!s1.content.has_children);
  assert!(s1.children.is_empty());

  let chapter = &page.items[2];
  assert!(chapter.content.has_children);
  assert!(chapter.children.is_empty());
}

#[tokio::test]
async fn previews_can_be_skipped_without_losing_flags() {
  let e = engine().await;
  let s = nested_statute(&e).await;

  let page = e.navigator().load_after(&s, 0, 1, false).await.unwrap();
  let part = &page.items[0];
  assert!(part.children.is_empty());
  assert!(part.content.has_children);
}

#[tokio::test]
async fn range_is_bounded_by_realised_rows() {
  let config = NavigationConfig { max_range_items: 3, ..Default::default() };
  let e = engine_with(config, MemoryCache::new()).await;
  let s = flat_statute(&e, 4).await;

  let range = e.navigator().load_range(&s, 100, 300, true).await.unwrap();
  assert_eq!(indices(&range.items, |i| i.order_index), [100, 200, 300]);
  assert_eq!(range.meta.total_items_in_statute, 4);

  // A sparse numeric span is fine as long as few rows fall inside it.
  let wide = e.navigator().load_range(&s, 150, 10_000, true).await.unwrap();
  assert_eq!(wide.meta.returned, 3);

  let err = e.navigator().load_range(&s, 100, 400, true).await.unwrap_err();
  assert!(matches!(err, Error::InvalidArgument(ref m) if m.contains("more than 3 items")));
  assert_eq!(err.class(), ErrorClass::BadRequest);
}

#[tokio::test]
async fn inverted_range_is_rejected() {
  let e = engine().await;
  let s = flat_statute(&e, 2).await;

  let err = e.navigator().load_range(&s, 200, 100, false).await.unwrap_err();
  assert!(matches!(err, Error::InvalidArgument(_)));

  let single = e.navigator().load_range(&s, 200, 200, false).await.unwrap();
  assert_eq!(single.meta.returned, 1);
}

#[tokio::test]
async fn limits_are_clamped() {
  let e = engine().await;
  let s = flat_statute(&e, 3).await;

  let page = e.navigator().load_after(&s, 0, 500, false).await.unwrap();
  assert_eq!(page.meta.limit, 50);
  assert_eq!(page.meta.returned, 3);

  let page = e.navigator().load_after(&s, 0, 0, false).await.unwrap();
  assert_eq!(page.meta.limit, 1);
  assert_eq!(indices(&page.items, |i| i.order_index), [100]);
  assert_eq!(page.meta.next_from_order, Some(100));
}

#[tokio::test]
async fn inactive_and_unindexed_nodes_are_skipped() {
  let e = engine().await;
  let s = flat_statute(&e, 3).await;
  let d2 = e
    .resolver()
    .resolve_by_slug(&s, "d2")
    .await
    .unwrap()
    .content
    .content_ref();
  e.store().set_status(d2, NodeStatus::Repealed).await.unwrap();
  division(&e, &s, "pending", None, 9, None).await;

  let page = e.navigator().load_after(&s, 100, 5, false).await.unwrap();
  assert_eq!(indices(&page.items, |i| i.order_index), [300]);
  assert!(!page.meta.has_more);
}

#[tokio::test]
async fn sequential_page_opens_at_index_with_breadcrumbs() {
  let e = engine().await;
  let s = nested_statute(&e).await;

  let page = e
    .navigator()
    .load_sequential(&s, 300, Direction::At, 5, true)
    .await
    .unwrap();
  assert_eq!(indices(&page.items, |i| i.order_index), [300, 400]);

  let chapter = &page.items[0];
  assert_eq!(chapter.kind, ContentKind::Division);
  assert_eq!(chapter.division_title.as_deref(), Some("CHAPTER"));
  assert_eq!(chapter.provision_type, None);
  assert_eq!(chapter.child_count, 1);

  let s2 = &page.items[1];
  assert_eq!(s2.provision_type.as_deref(), Some("section"));
  let trail: Vec<_> = s2.breadcrumb.as_ref().unwrap().iter().map(|c| c.slug.as_str()).collect();
  assert_eq!(trail, ["nested", "part", "chapter", "s2"]);

  let bare = e
    .navigator()
    .load_sequential(&s, 300, Direction::Before, 5, false)
    .await
    .unwrap();
  assert_eq!(indices(&bare.items, |i| i.order_index), [200, 100]);
  assert!(bare.items.iter().all(|i| i.breadcrumb.is_none()));
  assert_eq!(bare.items[1].division_id, None);
  assert_eq!(bare.items[0].division_id, Some(bare.items[1].id));
}

#[tokio::test]
async fn navigation_of_unknown_positions_is_empty() {
  let e = engine().await;
  let s = statute(&e, "empty").await;

  let page = e.navigator().load_before(&s, 100, 5, true).await.unwrap();
  assert!(page.items.is_empty());
  assert_eq!(page.meta.next_from_order, None);
}

#[tokio::test]
async fn items_serialise_with_flat_kind_fields() {
  let e = engine().await;
  let s = nested_statute(&e).await;

  let page = e.navigator().load_after(&s, 0, 2, true).await.unwrap();
  let json = serde_json::to_value(&page).unwrap();
  let part = &json["items"][0];
  assert_eq!(part["type"], "division");
  assert_eq!(part["content"]["type_name"], "part");
  assert_eq!(part["content"]["child_count"], 2);
  assert_eq!(part["children"][0]["slug"], "chapter");
  assert_eq!(json["items"][1]["content"]["division_id"], part["content"]["id"]);
  assert_eq!(json["meta"]["direction"], "after");
  assert_eq!(json["meta"]["next_from_order"], 200);

  let flat = e.navigator().load_sequential(&s, 0, Direction::After, 1, false).await.unwrap();
  let json = serde_json::to_value(&flat).unwrap();
  assert_eq!(json["items"][0]["division_title"], "PART");
  assert!(json["items"][0].get("breadcrumb").is_none());
}

#[tokio::test]
async fn default_range_guard_allows_one_hundred_items() {
  let e = engine().await;
  let s = flat_statute(&e, 101).await;

  let hundred = e.navigator().load_range(&s, 100, 10_000, false).await.unwrap();
  assert_eq!(hundred.meta.returned, 100);

  let err = e.navigator().load_range(&s, 100, 10_100, false).await.unwrap_err();
  assert!(matches!(err, Error::InvalidArgument(ref m) if m.contains("more than 100 items")));
}

#[tokio::test]
async fn ties_at_the_page_edge_stay_together() {
  let e = engine().await;
  let s = statute(&e, "dupes").await;
  division(&e, &s, "a", None, 1, Some(100)).await;
  division(&e, &s, "b", None, 2, Some(200)).await;
  provision(&e, section(&s, "b-sec"), Some(200)).await;
  division(&e, &s, "c", None, 3, Some(300)).await;

  let page = e.navigator().load_after(&s, 0, 2, false).await.unwrap();
  let slugs: Vec<_> = page.items.iter().map(|i| i.content.slug.as_str()).collect();
  assert_eq!(slugs, ["a", "b", "b-sec"]);
  assert_eq!(page.meta.returned, 3);
  assert_eq!(page.meta.next_from_order, Some(200));

  let next = e.navigator().load_after(&s, 200, 2, false).await.unwrap();
  assert_eq!(indices(&next.items, |i| i.order_index), [300]);

  let back = e.navigator().load_before(&s, 300, 1, false).await.unwrap();
  let slugs: Vec<_> = back.items.iter().map(|i| i.content.slug.as_str()).collect();
  assert_eq!(slugs, ["b-sec", "b"]);
  assert_eq!(back.meta.next_from_order, Some(200));
}
