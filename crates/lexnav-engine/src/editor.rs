//! Structural mutations and the cache invalidation each one requires.

use lexnav_core::{
  cache::ContentCache,
  node::{
    ContentKind, ContentRef, Division, DivisionId, NewDivision, NewProvision, NodeStatus,
    Provision, ProvisionId,
  },
  statute::{Statute, StatuteId},
  store::StatuteStore,
};
use tracing::{info, warn};

use crate::{
  Error, Result,
  breadcrumb::BreadcrumbBuilder,
  context::Context,
  order::{OrderIndexManager, ReindexReport},
};

/// Where a new node goes in the reading order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Placement {
  /// After the current last node of the statute.
  #[default]
  Append,
  /// Into the gap following this order index.
  After(i64),
}

impl Placement {
  fn after(self) -> Option<i64> {
    match self {
      Self::Append => None,
      Self::After(idx) => Some(idx),
    }
  }
}

pub struct ContentEditor<S, C> {
  ctx:         Context<S, C>,
  indices:     OrderIndexManager<S, C>,
  breadcrumbs: BreadcrumbBuilder<S, C>,
}

impl<S, C> Clone for ContentEditor<S, C> {
  fn clone(&self) -> Self {
    Self {
      ctx:         self.ctx.clone(),
      indices:     self.indices.clone(),
      breadcrumbs: self.breadcrumbs.clone(),
    }
  }
}

impl<S: StatuteStore, C: ContentCache> ContentEditor<S, C> {
  pub(crate) fn new(
    ctx: Context<S, C>,
    indices: OrderIndexManager<S, C>,
    breadcrumbs: BreadcrumbBuilder<S, C>,
  ) -> Self {
    Self { ctx, indices, breadcrumbs }
  }

  async fn statute(&self, id: StatuteId) -> Result<Statute> {
    self
      .ctx
      .store
      .get_statute(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("statute {id} not found")))
  }

  async fn division(&self, id: DivisionId) -> Result<Division> {
    self
      .ctx
      .store
      .get_division(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("division {id} not found")))
  }

  async fn provision(&self, id: ProvisionId) -> Result<Provision> {
    self
      .ctx
      .store
      .get_provision(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("provision {id} not found")))
  }

  /// Flush after a committed write. The write stands either way, so a
  /// failed flush is logged rather than returned.
  async fn flush(&self, statute: StatuteId) {
    if let Err(err) = self.ctx.flush_statute(statute, &[]).await {
      warn!(%statute, error = %err, "cache flush after write failed");
    }
  }

  /// Insert a division with a freshly computed order index.
  pub async fn create_division(
    &self,
    mut input: NewDivision,
    placement: Placement,
  ) -> Result<Division> {
    let statute = self.statute(input.statute_id).await?;
    if let Some(parent) = input.parent_division_id {
      let parent = self.division(parent).await?;
      same_statute(&statute, parent.statute_id, ContentRef::Division(parent.id))?;
      input.level = parent.level + 1;
    }

    let parent = input.parent_division_id.map(ContentRef::Division);
    let index = self
      .indices
      .calculate_order_index(&statute, ContentKind::Division, parent, placement.after())
      .await?;
    input.order_index = Some(index);

    let division = self.ctx.store.insert_division(input).await.map_err(Error::store)?;
    self.flush(statute.id).await;
    info!(statute = %statute.id, division = %division.id, order_index = index, "division created");
    Ok(division)
  }

  /// Insert a provision with a freshly computed order index.
  pub async fn create_provision(
    &self,
    mut input: NewProvision,
    placement: Placement,
  ) -> Result<Provision> {
    let statute = self.statute(input.statute_id).await?;
    if let Some(division) = input.division_id {
      let division = self.division(division).await?;
      same_statute(&statute, division.statute_id, ContentRef::Division(division.id))?;
    }
    if let Some(parent) = input.parent_provision_id {
      let parent = self.provision(parent).await?;
      same_statute(&statute, parent.statute_id, ContentRef::Provision(parent.id))?;
      input.level = parent.level + 1;
      if input.division_id.is_none() {
        input.division_id = parent.division_id;
      }
    }

    let parent = input
      .parent_provision_id
      .map(ContentRef::Provision)
      .or(input.division_id.map(ContentRef::Division));
    let index = self
      .indices
      .calculate_order_index(&statute, ContentKind::Provision, parent, placement.after())
      .await?;
    input.order_index = Some(index);

    let provision = self.ctx.store.insert_provision(input).await.map_err(Error::store)?;
    self.flush(statute.id).await;
    info!(statute = %statute.id, provision = %provision.id, order_index = index, "provision created");
    Ok(provision)
  }

  /// Re-parent a division, then renumber the statute so the reading order
  /// follows the new structure.
  pub async fn move_division(
    &self,
    id: DivisionId,
    new_parent: Option<DivisionId>,
    sort_order: i64,
  ) -> Result<ReindexReport> {
    let division = self.division(id).await?;
    let statute = self.statute(division.statute_id).await?;

    if let Some(parent) = new_parent {
      let parent = self.division(parent).await?;
      same_statute(&statute, parent.statute_id, ContentRef::Division(parent.id))?;
      let lineage = self.ctx.store.division_lineage(parent.id).await.map_err(Error::store)?;
      if lineage.iter().any(|d| d.id == id) {
        return Err(Error::InvalidArgument(format!(
          "division {id} cannot move under its own descendant {}",
          parent.id
        )));
      }
    }

    self.ctx.store.place_division(id, new_parent, sort_order).await.map_err(Error::store)?;
    self.breadcrumbs.invalidate(ContentRef::Division(id), Some(&statute)).await?;
    Ok(self.indices.reindex_statute(&statute, false).await)
  }

  /// Re-parent a provision. Without an explicit division it joins its new
  /// parent's division.
  pub async fn move_provision(
    &self,
    id: ProvisionId,
    division: Option<DivisionId>,
    parent: Option<ProvisionId>,
    sort_order: i64,
  ) -> Result<ReindexReport> {
    let provision = self.provision(id).await?;
    let statute = self.statute(provision.statute_id).await?;

    let mut division = division;
    if let Some(d) = division {
      let d = self.division(d).await?;
      same_statute(&statute, d.statute_id, ContentRef::Division(d.id))?;
    }
    if let Some(parent) = parent {
      let parent = self.provision(parent).await?;
      same_statute(&statute, parent.statute_id, ContentRef::Provision(parent.id))?;
      let lineage = self.ctx.store.provision_lineage(parent.id).await.map_err(Error::store)?;
      if lineage.iter().any(|p| p.id == id) {
        return Err(Error::InvalidArgument(format!(
          "provision {id} cannot move under its own descendant {}",
          parent.id
        )));
      }
      division = division.or(parent.division_id);
    }

    self
      .ctx
      .store
      .place_provision(id, division, parent, sort_order)
      .await
      .map_err(Error::store)?;
    self.breadcrumbs.invalidate(ContentRef::Provision(id), Some(&statute)).await?;
    Ok(self.indices.reindex_statute(&statute, false).await)
  }

  /// Repeal, amend or reactivate a node. The node keeps its index.
  pub async fn set_status(&self, node: ContentRef, status: NodeStatus) -> Result<()> {
    let statute_id = match node {
      ContentRef::Division(id) => self.division(id).await?.statute_id,
      ContentRef::Provision(id) => self.provision(id).await?.statute_id,
    };
    self.ctx.store.set_status(node, status).await.map_err(Error::store)?;
    self.flush(statute_id).await;
    info!(statute = %statute_id, %node, status = status.as_str(), "status changed");
    Ok(())
  }
}

fn same_statute(statute: &Statute, other: StatuteId, node: ContentRef) -> Result<()> {
  if statute.id == other {
    return Ok(());
  }
  Err(Error::InvalidArgument(format!(
    "{node} belongs to statute {other}, not {}",
    statute.id
  )))
}
