use lexnav_core::{
  node::{ContentKind, ContentNode, ContentRef, NodeStatus},
  store::StatuteStore,
};

use super::{division, engine, flat_statute, provision, section, statute};
use crate::{Error, ErrorClass};

#[tokio::test]
async fn slug_resolves_with_position() {
  let e = engine().await;
  let s = flat_statute(&e, 3).await;

  let found = e.resolver().resolve_by_slug(&s, "d2").await.unwrap();
  assert_eq!(found.kind, ContentKind::Division);
  assert_eq!(found.order_index, 200);
  assert_eq!(found.position.total_items, 3);
  assert!(found.position.has_content_before);
  assert!(found.position.has_content_after);

  let first = e.resolver().resolve_by_slug(&s, "d1").await.unwrap();
  assert!(!first.position.has_content_before);
  assert!(first.position.has_content_after);
}

#[tokio::test]
async fn division_wins_a_shared_slug() {
  let e = engine().await;
  let s = statute(&e, "act").await;
  provision(&e, section(&s, "one"), Some(100)).await;
  division(&e, &s, "one", None, 1, Some(200)).await;

  let found = e.resolver().resolve_by_slug(&s, "one").await.unwrap();
  assert!(matches!(found.content, ContentNode::Division(_)));
  assert_eq!(found.order_index, 200);
}

#[tokio::test]
async fn unknown_and_inactive_slugs_are_not_found() {
  let e = engine().await;
  let s = flat_statute(&e, 2).await;
  let d2 = e.resolver().resolve_by_slug(&s, "d2").await.unwrap().content.content_ref();
  e.store().set_status(d2, NodeStatus::Repealed).await.unwrap();

  for slug in ["nope", "d2"] {
    let err = e.resolver().resolve_by_slug(&s, slug).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(err.class(), ErrorClass::NotFound);
    assert_eq!(err.class().status_code(), 404);
  }
}

#[tokio::test]
async fn unindexed_content_asks_for_a_reindex() {
  let e = engine().await;
  let s = statute(&e, "act").await;
  division(&e, &s, "draft", None, 1, None).await;

  let err = e.resolver().resolve_by_slug(&s, "draft").await.unwrap_err();
  let Error::PreconditionFailed(message) = &err else { panic!("unexpected error: {err}") };
  assert!(message.contains(&format!("lexnav reindex {}", s.id)));
  assert_eq!(err.class(), ErrorClass::Internal);

  e.indices().reindex_statute(&s, false).await;
  let found = e.resolver().resolve_by_slug(&s, "draft").await.unwrap();
  assert_eq!(found.order_index, 100);
}

#[tokio::test]
async fn order_index_lookup() {
  let e = engine().await;
  let s = statute(&e, "act").await;
  let d = division(&e, &s, "d", None, 1, Some(100)).await;
  provision(&e, section(&s, "p").in_division(d.id), Some(200)).await;

  let p = e.resolver().resolve_by_order_index(&s, 200).await.unwrap().unwrap();
  assert_eq!(p.kind, ContentKind::Provision);
  assert_eq!(p.content.slug(), "p");
  assert!(!p.position.has_content_after);

  assert!(e.resolver().resolve_by_order_index(&s, 150).await.unwrap().is_none());

  e.store().set_status(ContentRef::Division(d.id), NodeStatus::Amended).await.unwrap();
  assert!(e.resolver().resolve_by_order_index(&s, 100).await.unwrap().is_none());
}

#[tokio::test]
async fn position_metadata_is_cached_until_invalidated() {
  let e = engine().await;
  let s = flat_statute(&e, 2).await;

  let before = e.resolver().position_metadata(&s, 200).await.unwrap();
  assert!(!before.has_content_after);
  assert_eq!(before.total_items, 2);

  // Written behind the engine's back: the cache keeps serving the old view.
  division(&e, &s, "d3", None, 3, Some(300)).await;
  let stale = e.resolver().position_metadata(&s, 200).await.unwrap();
  assert_eq!(stale, before);
  assert_eq!(e.resolver().total_items(&s).await.unwrap(), 2);

  assert!(e.resolver().invalidate_statute(&s).await.unwrap() >= 2);
  let fresh = e.resolver().position_metadata(&s, 200).await.unwrap();
  assert!(fresh.has_content_after);
  assert_eq!(fresh.total_items, 3);
}

#[tokio::test]
async fn statutes_do_not_see_each_other() {
  let e = engine().await;
  let a = flat_statute(&e, 2).await;
  let b = statute(&e, "other").await;
  division(&e, &b, "d1", None, 1, Some(100)).await;

  let in_b = e.resolver().resolve_by_slug(&b, "d1").await.unwrap();
  assert_eq!(in_b.content.statute_id(), b.id);
  assert_eq!(in_b.position.total_items, 1);
  assert!(e.resolver().resolve_by_slug(&b, "d2").await.is_err());
  assert_eq!(e.resolver().total_items(&a).await.unwrap(), 2);
}
