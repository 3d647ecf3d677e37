//! Shared handles for the engine services and the statute-wide cache flush.

use std::sync::Arc;

use lexnav_core::{
  cache::{self, ContentCache},
  config::{NavigationConfig, UntaggedFlush},
  statute::StatuteId,
  store::StatuteStore,
};
use tracing::debug;

use crate::{Error, Result};

/// Store, cache and configuration shared by every service.
pub(crate) struct Context<S, C> {
  pub store:  Arc<S>,
  pub cache:  Arc<C>,
  pub config: Arc<NavigationConfig>,
}

impl<S, C> Clone for Context<S, C> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      cache:  Arc::clone(&self.cache),
      config: Arc::clone(&self.config),
    }
  }
}

impl<S: StatuteStore, C: ContentCache> Context<S, C> {
  /// Whether statute-scoped entries are grouped under a tag.
  pub fn tagging(&self) -> bool { self.config.tags_enabled && self.cache.supports_tags() }

  /// Tag to store statute-derived entries under, if tagging is in effect.
  pub fn tag(&self, statute: StatuteId) -> Option<String> {
    self.tagging().then(|| cache::statute_tag(statute))
  }

  /// Active indexed nodes of the statute, cached under `total_items:{id}`.
  pub async fn total_items(&self, statute: StatuteId) -> Result<u64> {
    cache::remember(
      self.cache.as_ref(),
      cache::total_items_key(statute),
      self.tag(statute),
      self.config.total_items_ttl(),
      || async {
        self.store.count_active_indexed(statute).await.map_err(Error::store)
      },
    )
    .await
  }

  /// Drop every cached entry derived from the statute.
  ///
  /// With tagging this is one tag flush. Without it the configured
  /// [`UntaggedFlush`] policy applies; `stale_indices` names position keys
  /// no longer held by any node (e.g. the old indices of a reindex).
  /// Returns the number of entries removed.
  pub async fn flush_statute(&self, statute: StatuteId, stale_indices: &[i64]) -> Result<usize> {
    if self.tagging() {
      return Ok(self.cache.flush_tag(&cache::statute_tag(statute)).await);
    }

    match self.config.untagged_flush {
      UntaggedFlush::Skip => {
        debug!(%statute, "cache has no tag support; statute entries left to expire");
        Ok(0)
      }
      UntaggedFlush::EnumerateKeys => {
        let keys = self.store.node_keys(statute).await.map_err(Error::store)?;

        let mut doomed = vec![cache::total_items_key(statute)];
        for key in &keys {
          doomed.push(cache::breadcrumb_key(statute, key.node));
          if let Some(idx) = key.order_index {
            doomed.push(cache::position_key(statute, idx));
          }
        }
        doomed.extend(stale_indices.iter().map(|&idx| cache::position_key(statute, idx)));
        doomed.sort_unstable();
        doomed.dedup();

        let mut removed = 0;
        for key in &doomed {
          if self.cache.forget(key).await {
            removed += 1;
          }
        }
        debug!(%statute, candidates = doomed.len(), removed, "flushed statute keys one by one");
        Ok(removed)
      }
    }
  }
}
