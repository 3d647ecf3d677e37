//! Slug and order-index resolution with cached position metadata.

use lexnav_core::{
  cache::{self, ContentCache},
  node::{ContentKind, ContentNode},
  statute::Statute,
  store::{NodeLookup, OrderWindow, StatuteStore},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Error, Result, context::Context};

/// Where an order index sits in its statute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionMetadata {
  pub order_index:        i64,
  pub total_items:        u64,
  pub has_content_before: bool,
  pub has_content_after:  bool,
}

/// A resolved node and its position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
  #[serde(rename = "type")]
  pub kind:        ContentKind,
  pub content:     ContentNode,
  pub order_index: i64,
  pub position:    PositionMetadata,
}

pub struct ContentResolver<S, C> {
  ctx: Context<S, C>,
}

impl<S, C> Clone for ContentResolver<S, C> {
  fn clone(&self) -> Self { Self { ctx: self.ctx.clone() } }
}

impl<S: StatuteStore, C: ContentCache> ContentResolver<S, C> {
  pub(crate) fn new(ctx: Context<S, C>) -> Self { Self { ctx } }

  /// Active division with the slug, else active provision with it.
  pub async fn resolve_by_slug(&self, statute: &Statute, slug: &str) -> Result<Resolution> {
    let node = self.find(statute, NodeLookup::Slug(slug.to_owned())).await?.ok_or_else(|| {
      Error::NotFound(format!(
        "content with slug '{slug}' not found in statute '{}'",
        statute.slug
      ))
    })?;
    self.resolution(statute, node).await
  }

  /// Active node holding the index, divisions first.
  pub async fn resolve_by_order_index(
    &self,
    statute: &Statute,
    order_index: i64,
  ) -> Result<Option<Resolution>> {
    match self.find(statute, NodeLookup::OrderIndex(order_index)).await? {
      Some(node) => Ok(Some(self.resolution(statute, node).await?)),
      None => Ok(None),
    }
  }

  async fn find(&self, statute: &Statute, lookup: NodeLookup) -> Result<Option<ContentNode>> {
    for kind in [ContentKind::Division, ContentKind::Provision] {
      let found = self
        .ctx
        .store
        .find_active(statute.id, kind, lookup.clone())
        .await
        .map_err(Error::store)?;
      if found.is_some() {
        return Ok(found);
      }
    }
    Ok(None)
  }

  async fn resolution(&self, statute: &Statute, node: ContentNode) -> Result<Resolution> {
    let Some(order_index) = node.order_index() else {
      warn!(
        statute = %statute.id,
        node = %node.content_ref(),
        slug = node.slug(),
        "content has no order_index; statute needs a backfill"
      );
      return Err(Error::PreconditionFailed(format!(
        "{} {} has no order_index. Run `lexnav reindex {}` to backfill order indices.",
        node.kind(),
        node.content_ref().raw_id(),
        statute.id
      )));
    };

    let position = self.position_metadata(statute, order_index).await?;
    Ok(Resolution { kind: node.kind(), content: node, order_index, position })
  }

  /// Total count and before/after flags for an index, cached per index.
  pub async fn position_metadata(
    &self,
    statute: &Statute,
    order_index: i64,
  ) -> Result<PositionMetadata> {
    cache::remember(
      self.ctx.cache.as_ref(),
      cache::position_key(statute.id, order_index),
      self.ctx.tag(statute.id),
      self.ctx.config.position_ttl(),
      || async {
        let store = &self.ctx.store;
        Ok::<_, Error>(PositionMetadata {
          order_index,
          total_items: self.ctx.total_items(statute.id).await?,
          has_content_before: store
            .has_active_in(statute.id, OrderWindow::Before(order_index))
            .await
            .map_err(Error::store)?,
          has_content_after: store
            .has_active_in(statute.id, OrderWindow::After(order_index))
            .await
            .map_err(Error::store)?,
        })
      },
    )
    .await
  }

  /// Active indexed nodes of the statute, cached.
  pub async fn total_items(&self, statute: &Statute) -> Result<u64> {
    self.ctx.total_items(statute.id).await
  }

  /// Flush every cached resolution of the statute.
  pub async fn invalidate_statute(&self, statute: &Statute) -> Result<usize> {
    self.ctx.flush_statute(statute.id, &[]).await
  }
}
