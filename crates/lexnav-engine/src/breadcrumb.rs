//! Root-to-node breadcrumb trails, cached per node.

use std::collections::HashSet;

use lexnav_core::{
  cache::{self, ContentCache},
  node::{ContentRef, Division, Provision},
  statute::Statute,
  store::StatuteStore,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result, context::Context};

/// One step of a breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crumb {
  pub id:          i64,
  pub slug:        String,
  pub title:       Option<String>,
  /// `"statute"`, or the division/provision type.
  #[serde(rename = "type")]
  pub kind:        String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub number:      Option<String>,
  pub order_index: Option<i64>,
}

impl Crumb {
  fn statute(statute: &Statute) -> Self {
    Self {
      id:          statute.id.0,
      slug:        statute.slug.clone(),
      title:       Some(statute.title.clone()),
      kind:        "statute".to_owned(),
      number:      None,
      order_index: None,
    }
  }
}

impl From<&Division> for Crumb {
  fn from(d: &Division) -> Self {
    Self {
      id:          d.id.0,
      slug:        d.slug.clone(),
      title:       Some(d.division_title.clone()),
      kind:        d.division_type.as_str().to_owned(),
      number:      d.division_number.clone(),
      order_index: d.order_index,
    }
  }
}

impl From<&Provision> for Crumb {
  fn from(p: &Provision) -> Self {
    Self {
      id:          p.id.0,
      slug:        p.slug.clone(),
      title:       p.provision_title.clone(),
      kind:        p.provision_type.as_str().to_owned(),
      number:      p.provision_number.clone(),
      order_index: p.order_index,
    }
  }
}

pub struct BreadcrumbBuilder<S, C> {
  ctx: Context<S, C>,
}

impl<S, C> Clone for BreadcrumbBuilder<S, C> {
  fn clone(&self) -> Self { Self { ctx: self.ctx.clone() } }
}

impl<S: StatuteStore, C: ContentCache> BreadcrumbBuilder<S, C> {
  pub(crate) fn new(ctx: Context<S, C>) -> Self { Self { ctx } }

  /// The owning statute, either given or looked up through the node.
  async fn statute_of(&self, node: ContentRef, statute: Option<&Statute>) -> Result<Statute> {
    if let Some(statute) = statute {
      return Ok(statute.clone());
    }
    let statute_id = match node {
      ContentRef::Division(id) => {
        self.ctx.store.get_division(id).await.map_err(Error::store)?.map(|d| d.statute_id)
      }
      ContentRef::Provision(id) => {
        self.ctx.store.get_provision(id).await.map_err(Error::store)?.map(|p| p.statute_id)
      }
    }
    .ok_or_else(|| Error::NotFound(format!("{node} not found")))?;

    self
      .ctx
      .store
      .get_statute(statute_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("statute {statute_id} not found")))
  }

  /// Statute root, then the division chain, then (for provisions) the
  /// provision chain. Cached under `breadcrumb:{statute}:{kind}:{id}`.
  pub async fn build(&self, node: ContentRef, statute: Option<&Statute>) -> Result<Vec<Crumb>> {
    let statute = self.statute_of(node, statute).await?;
    cache::remember(
      self.ctx.cache.as_ref(),
      cache::breadcrumb_key(statute.id, node),
      self.ctx.tag(statute.id),
      self.ctx.config.breadcrumb_ttl(),
      || self.trail(node, &statute),
    )
    .await
  }

  /// Build trails for several nodes of one statute, in input order.
  pub async fn build_many(&self, nodes: &[ContentRef], statute: &Statute) -> Result<Vec<Vec<Crumb>>> {
    let mut trails = Vec::with_capacity(nodes.len());
    for &node in nodes {
      trails.push(self.build(node, Some(statute)).await?);
    }
    Ok(trails)
  }

  async fn trail(&self, node: ContentRef, statute: &Statute) -> Result<Vec<Crumb>> {
    let mut trail = vec![Crumb::statute(statute)];
    let store = &self.ctx.store;

    match node {
      ContentRef::Division(id) => {
        let chain = store.division_lineage(id).await.map_err(Error::store)?;
        if chain.is_empty() {
          return Err(Error::NotFound(format!("{node} not found")));
        }
        trail.extend(chain.iter().map(Crumb::from));
      }
      ContentRef::Provision(id) => {
        let chain = store.provision_lineage(id).await.map_err(Error::store)?;
        if chain.is_empty() {
          return Err(Error::NotFound(format!("{node} not found")));
        }
        // Sub-provisions may leave division_id unset; the nearest ancestor
        // that has one decides.
        if let Some(division) = chain.iter().rev().find_map(|p| p.division_id) {
          let divisions = store.division_lineage(division).await.map_err(Error::store)?;
          trail.extend(divisions.iter().map(Crumb::from));
        }
        trail.extend(chain.iter().map(Crumb::from));
      }
    }
    Ok(trail)
  }

  /// Forget the node's trail and, recursively, those of all its
  /// descendants. Returns the number of nodes visited.
  pub async fn invalidate(&self, node: ContentRef, statute: Option<&Statute>) -> Result<usize> {
    let statute = self.statute_of(node, statute).await?;

    let mut visited = HashSet::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
      if !visited.insert(current) {
        continue;
      }
      self.ctx.cache.forget(&cache::breadcrumb_key(statute.id, current)).await;
      let children = self.ctx.store.children_of(current).await.map_err(Error::store)?;
      stack.extend(children);
    }

    debug!(statute = %statute.id, %node, nodes = visited.len(), "invalidated breadcrumbs");
    Ok(visited.len())
  }

  /// Flush every cached entry of the statute (breadcrumbs included).
  pub async fn invalidate_statute(&self, statute: &Statute) -> Result<usize> {
    self.ctx.flush_statute(statute.id, &[]).await
  }

  /// The single-element trail of the statute itself.
  pub fn build_statute_breadcrumb(&self, statute: &Statute) -> Vec<Crumb> {
    vec![Crumb::statute(statute)]
  }
}
