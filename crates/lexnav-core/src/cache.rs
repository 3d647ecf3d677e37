//! The `ContentCache` trait, cache key layout and the `remember` helper.
//!
//! Caches hold derived data only (breadcrumbs, position metadata, totals).
//! They are invalidated, never locked, and never consulted as a source of
//! truth.

use std::{future::Future, time::Duration};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{node::ContentRef, statute::StatuteId};

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Tag shared by every entry derived from one statute.
pub fn statute_tag(statute: StatuteId) -> String { format!("statute:{statute}") }

/// `breadcrumb:{statute}:{kind}:{id}`
pub fn breadcrumb_key(statute: StatuteId, node: ContentRef) -> String {
  format!("breadcrumb:{statute}:{}:{}", node.kind(), node.raw_id())
}

/// `position:{statute}:{order_index}`
pub fn position_key(statute: StatuteId, order_index: i64) -> String {
  format!("position:{statute}:{order_index}")
}

/// `total_items:{statute}`
pub fn total_items_key(statute: StatuteId) -> String { format!("total_items:{statute}") }

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A value to store, with its expiry and optional group tag.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub key:   String,
  /// Ignored by backends whose [`ContentCache::supports_tags`] is `false`.
  pub tag:   Option<String>,
  pub ttl:   Duration,
  pub value: Value,
}

/// Abstraction over a key-value cache backend.
///
/// Tag support is a capability: callers check [`Self::supports_tags`] and
/// fall back to forgetting keys one by one when it is absent.
pub trait ContentCache: Send + Sync {
  /// Fetch a live (unexpired) value.
  fn get<'a>(&'a self, key: &'a str) -> impl Future<Output = Option<Value>> + Send + 'a;

  /// Store a value, replacing any previous entry under the same key.
  fn put(&self, entry: CacheEntry) -> impl Future<Output = ()> + Send + '_;

  /// Remove a key. Returns `true` if an entry was present.
  fn forget<'a>(&'a self, key: &'a str) -> impl Future<Output = bool> + Send + 'a;

  /// Whether [`Self::flush_tag`] actually removes anything.
  fn supports_tags(&self) -> bool;

  /// Remove every entry stored under `tag`. Returns the number removed.
  fn flush_tag<'a>(&'a self, tag: &'a str) -> impl Future<Output = usize> + Send + 'a;
}

/// Return the cached value under `key`, or compute it with `produce`, store
/// it for `ttl` and return it.
///
/// An entry that no longer deserialises as `T` counts as a miss. Producer
/// errors are returned as-is and nothing is cached.
pub async fn remember<C, T, E, F, Fut>(
  cache: &C,
  key: String,
  tag: Option<String>,
  ttl: Duration,
  produce: F,
) -> Result<T, E>
where
  C: ContentCache,
  T: Serialize + DeserializeOwned,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<T, E>>,
{
  if let Some(hit) = cache.get(&key).await
    && let Ok(value) = serde_json::from_value::<T>(hit)
  {
    return Ok(value);
  }

  let value = produce().await?;
  if let Ok(json) = serde_json::to_value(&value) {
    cache.put(CacheEntry { key, tag, ttl, value: json }).await;
  }
  Ok(value)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::node::{DivisionId, ProvisionId};

  #[test]
  fn key_layout() {
    let s = StatuteId(7);
    assert_eq!(statute_tag(s), "statute:7");
    assert_eq!(
      breadcrumb_key(s, ContentRef::Division(DivisionId(3))),
      "breadcrumb:7:division:3"
    );
    assert_eq!(
      breadcrumb_key(s, ContentRef::Provision(ProvisionId(3))),
      "breadcrumb:7:provision:3"
    );
    assert_eq!(position_key(s, 200), "position:7:200");
    assert_eq!(total_items_key(s), "total_items:7");
  }
}
