//! In-process implementation of [`ContentCache`].
//!
//! Entries live in a [`DashMap`] with a per-entry expiry. Expired entries are
//! dropped lazily on read, or in bulk through [`MemoryCache::purge_expired`].
//! Tag support can be switched off to exercise the untagged invalidation
//! path of the engine.

use std::{
  collections::HashSet,
  sync::atomic::{AtomicU64, Ordering},
  time::Instant,
};

use dashmap::DashMap;
use lexnav_core::cache::{CacheEntry, ContentCache};
use serde_json::Value;
use tracing::debug;

struct Slot {
  value:      Value,
  expires_at: Instant,
  tag:        Option<String>,
}

/// Hit/miss counters and current size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
  pub hits:    u64,
  pub misses:  u64,
  pub entries: usize,
}

pub struct MemoryCache {
  entries:        DashMap<String, Slot>,
  /// tag → keys stored under it.
  tags:           DashMap<String, HashSet<String>>,
  tags_supported: bool,
  hits:           AtomicU64,
  misses:         AtomicU64,
}

impl Default for MemoryCache {
  fn default() -> Self { Self::new() }
}

impl MemoryCache {
  /// A cache with tag support.
  pub fn new() -> Self { Self::with_tags(true) }

  /// A cache that ignores tags and reports `supports_tags() == false`.
  pub fn untagged() -> Self { Self::with_tags(false) }

  fn with_tags(tags_supported: bool) -> Self {
    Self {
      entries: DashMap::new(),
      tags: DashMap::new(),
      tags_supported,
      hits: AtomicU64::new(0),
      misses: AtomicU64::new(0),
    }
  }

  pub fn stats(&self) -> CacheStats {
    CacheStats {
      hits:    self.hits.load(Ordering::Relaxed),
      misses:  self.misses.load(Ordering::Relaxed),
      entries: self.entries.len(),
    }
  }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  /// Drop every expired entry. Returns the number removed.
  pub fn purge_expired(&self) -> usize {
    let now = Instant::now();
    let mut expired = Vec::new();
    self.entries.retain(|key, slot| {
      let live = slot.expires_at > now;
      if !live {
        expired.push((key.clone(), slot.tag.take()));
      }
      live
    });

    for (key, tag) in &expired {
      if let Some(tag) = tag {
        self.untag(tag, key);
      }
    }
    if !expired.is_empty() {
      debug!(removed = expired.len(), "purged expired cache entries");
    }
    expired.len()
  }

  fn untag(&self, tag: &str, key: &str) {
    if let Some(mut keys) = self.tags.get_mut(tag) {
      keys.remove(key);
    }
    self.tags.remove_if(tag, |_, keys| keys.is_empty());
  }
}

impl ContentCache for MemoryCache {
  async fn get(&self, key: &str) -> Option<Value> {
    let now = Instant::now();
    let live = self
      .entries
      .get(key)
      .and_then(|slot| (slot.expires_at > now).then(|| slot.value.clone()));

    match live {
      Some(value) => {
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(value)
      }
      None => {
        self.misses.fetch_add(1, Ordering::Relaxed);
        // The read guard is released; dropping the stale slot is safe now.
        if let Some((_, slot)) = self.entries.remove_if(key, |_, slot| slot.expires_at <= now)
          && let Some(tag) = slot.tag
        {
          self.untag(&tag, key);
        }
        None
      }
    }
  }

  async fn put(&self, entry: CacheEntry) {
    let tag = entry.tag.filter(|_| self.tags_supported);
    if let Some(tag) = &tag {
      self.tags.entry(tag.clone()).or_default().insert(entry.key.clone());
    }
    let slot = Slot {
      value:      entry.value,
      expires_at: Instant::now() + entry.ttl,
      tag:        tag.clone(),
    };
    if let Some(old) = self.entries.insert(entry.key.clone(), slot)
      && let Some(old_tag) = old.tag
      && tag.as_ref() != Some(&old_tag)
    {
      self.untag(&old_tag, &entry.key);
    }
  }

  async fn forget(&self, key: &str) -> bool {
    match self.entries.remove(key) {
      Some((_, slot)) => {
        if let Some(tag) = slot.tag {
          self.untag(&tag, key);
        }
        true
      }
      None => false,
    }
  }

  fn supports_tags(&self) -> bool { self.tags_supported }

  async fn flush_tag(&self, tag: &str) -> usize {
    if !self.tags_supported {
      return 0;
    }
    let Some((_, keys)) = self.tags.remove(tag) else {
      return 0;
    };
    let removed = keys
      .iter()
      .filter(|key| {
        self
          .entries
          .remove_if(key.as_str(), |_, slot| slot.tag.as_deref() == Some(tag))
          .is_some()
      })
      .count();
    debug!(tag, removed, "flushed cache tag");
    removed
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use serde_json::json;

  use super::*;

  fn entry(key: &str, tag: Option<&str>, ttl: Duration) -> CacheEntry {
    CacheEntry {
      key: key.into(),
      tag: tag.map(Into::into),
      ttl,
      value: json!({ "key": key }),
    }
  }

  const HOUR: Duration = Duration::from_secs(3600);

  #[tokio::test]
  async fn put_get_forget() {
    let cache = MemoryCache::new();
    cache.put(entry("a", None, HOUR)).await;

    assert_eq!(cache.get("a").await, Some(json!({ "key": "a" })));
    assert!(cache.forget("a").await);
    assert!(!cache.forget("a").await);
    assert_eq!(cache.get("a").await, None);

    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 0));
  }

  #[tokio::test]
  async fn expired_entries_read_as_misses() {
    let cache = MemoryCache::new();
    cache.put(entry("a", Some("t"), Duration::ZERO)).await;
    cache.put(entry("b", None, Duration::ZERO)).await;
    cache.put(entry("c", None, HOUR)).await;

    assert_eq!(cache.get("a").await, None);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.purge_expired(), 1);
    assert_eq!(cache.len(), 1);
  }

  #[tokio::test]
  async fn purged_entries_leave_their_tag() {
    let cache = MemoryCache::new();
    cache.put(entry("stale", Some("statute:1"), Duration::ZERO)).await;
    cache.put(entry("fresh", Some("statute:1"), HOUR)).await;
    cache.put(entry("gone", Some("statute:2"), Duration::ZERO)).await;

    assert_eq!(cache.purge_expired(), 2);
    let keys = cache.tags.get("statute:1").map(|k| k.clone()).unwrap_or_default();
    assert_eq!(keys, HashSet::from(["fresh".to_owned()]));
    assert!(!cache.tags.contains_key("statute:2"));
    assert_eq!(cache.flush_tag("statute:1").await, 1);
  }

  #[tokio::test]
  async fn flush_tag_removes_only_tagged_entries() {
    let cache = MemoryCache::new();
    cache.put(entry("breadcrumb:1:division:1", Some("statute:1"), HOUR)).await;
    cache.put(entry("position:1:100", Some("statute:1"), HOUR)).await;
    cache.put(entry("position:2:100", Some("statute:2"), HOUR)).await;
    cache.put(entry("loose", None, HOUR)).await;

    assert_eq!(cache.flush_tag("statute:1").await, 2);
    assert_eq!(cache.flush_tag("statute:1").await, 0);
    assert!(cache.get("position:2:100").await.is_some());
    assert!(cache.get("loose").await.is_some());
  }

  #[tokio::test]
  async fn retagged_key_leaves_old_tag() {
    let cache = MemoryCache::new();
    cache.put(entry("k", Some("old"), HOUR)).await;
    cache.put(entry("k", Some("new"), HOUR)).await;

    assert_eq!(cache.flush_tag("old").await, 0);
    assert!(cache.get("k").await.is_some());
    assert_eq!(cache.flush_tag("new").await, 1);
  }

  #[tokio::test]
  async fn untagged_cache_ignores_tags() {
    let cache = MemoryCache::untagged();
    assert!(!cache.supports_tags());
    cache.put(entry("k", Some("statute:1"), HOUR)).await;

    assert_eq!(cache.flush_tag("statute:1").await, 0);
    assert!(cache.get("k").await.is_some());
  }
}
