//! A store whose reindex transaction and key enumeration can be made to
//! fail on demand.

use std::{
  collections::HashMap,
  sync::atomic::{AtomicBool, Ordering},
};

use lexnav_cache::MemoryCache;
use lexnav_core::{
  config::NavigationConfig,
  node::{
    ContentKind, ContentNode, ContentRef, Division, DivisionId, NewDivision, NewProvision,
    NodeStatus, Provision, ProvisionId,
  },
  order::ReindexOutcome,
  statute::{NewStatute, Statute, StatuteId},
  store::{ChildDivision, IndexCensus, NodeKey, NodeLookup, OrderWindow, SequencedRow, StatuteStore},
};
use lexnav_store_sqlite::SqliteStore;

use crate::Lexnav;

#[derive(Debug, thiserror::Error)]
pub enum FlakyError {
  #[error(transparent)]
  Store(#[from] lexnav_store_sqlite::Error),
  #[error("database is locked; transaction rolled back")]
  Locked,
}

pub struct FlakyStore {
  inner:          SqliteStore,
  fail_reindex:   AtomicBool,
  fail_node_keys: AtomicBool,
}

impl FlakyStore {
  pub fn fail_reindex(&self) { self.fail_reindex.store(true, Ordering::SeqCst); }

  pub fn fail_node_keys(&self) { self.fail_node_keys.store(true, Ordering::SeqCst); }
}

pub async fn flaky_engine(
  config: NavigationConfig,
  cache: MemoryCache,
) -> Lexnav<FlakyStore, MemoryCache> {
  let inner = SqliteStore::open_in_memory().await.expect("in-memory store");
  let store = FlakyStore {
    inner,
    fail_reindex: AtomicBool::new(false),
    fail_node_keys: AtomicBool::new(false),
  };
  Lexnav::new(store, cache, config).expect("valid config")
}

type Result<T> = std::result::Result<T, FlakyError>;

impl StatuteStore for FlakyStore {
  type Error = FlakyError;

  async fn insert_statute(&self, input: NewStatute) -> Result<Statute> {
    Ok(self.inner.insert_statute(input).await?)
  }

  async fn get_statute(&self, id: StatuteId) -> Result<Option<Statute>> {
    Ok(self.inner.get_statute(id).await?)
  }

  async fn find_statute(&self, slug: &str) -> Result<Option<Statute>> {
    Ok(self.inner.find_statute(slug).await?)
  }

  async fn list_statutes(&self) -> Result<Vec<Statute>> { Ok(self.inner.list_statutes().await?) }

  async fn insert_division(&self, input: NewDivision) -> Result<Division> {
    Ok(self.inner.insert_division(input).await?)
  }

  async fn insert_provision(&self, input: NewProvision) -> Result<Provision> {
    Ok(self.inner.insert_provision(input).await?)
  }

  async fn set_order_index(&self, node: ContentRef, order_index: Option<i64>) -> Result<()> {
    Ok(self.inner.set_order_index(node, order_index).await?)
  }

  async fn set_status(&self, node: ContentRef, status: NodeStatus) -> Result<()> {
    Ok(self.inner.set_status(node, status).await?)
  }

  async fn place_division(
    &self,
    id: DivisionId,
    parent: Option<DivisionId>,
    sort_order: i64,
  ) -> Result<()> {
    Ok(self.inner.place_division(id, parent, sort_order).await?)
  }

  async fn place_provision(
    &self,
    id: ProvisionId,
    division: Option<DivisionId>,
    parent: Option<ProvisionId>,
    sort_order: i64,
  ) -> Result<()> {
    Ok(self.inner.place_provision(id, division, parent, sort_order).await?)
  }

  async fn get_division(&self, id: DivisionId) -> Result<Option<Division>> {
    Ok(self.inner.get_division(id).await?)
  }

  async fn get_provision(&self, id: ProvisionId) -> Result<Option<Provision>> {
    Ok(self.inner.get_provision(id).await?)
  }

  async fn find_active(
    &self,
    statute: StatuteId,
    kind: ContentKind,
    lookup: NodeLookup,
  ) -> Result<Option<ContentNode>> {
    Ok(self.inner.find_active(statute, kind, lookup).await?)
  }

  async fn division_lineage(&self, id: DivisionId) -> Result<Vec<Division>> {
    Ok(self.inner.division_lineage(id).await?)
  }

  async fn provision_lineage(&self, id: ProvisionId) -> Result<Vec<Provision>> {
    Ok(self.inner.provision_lineage(id).await?)
  }

  async fn children_of(&self, node: ContentRef) -> Result<Vec<ContentRef>> {
    Ok(self.inner.children_of(node).await?)
  }

  async fn node_keys(&self, statute: StatuteId) -> Result<Vec<NodeKey>> {
    if self.fail_node_keys.load(Ordering::SeqCst) {
      return Err(FlakyError::Locked);
    }
    Ok(self.inner.node_keys(statute).await?)
  }

  async fn sequenced(
    &self,
    statute: StatuteId,
    window: OrderWindow,
    limit: usize,
  ) -> Result<Vec<SequencedRow>> {
    Ok(self.inner.sequenced(statute, window, limit).await?)
  }

  async fn has_active_in(&self, statute: StatuteId, window: OrderWindow) -> Result<bool> {
    Ok(self.inner.has_active_in(statute, window).await?)
  }

  async fn count_active_indexed(&self, statute: StatuteId) -> Result<u64> {
    Ok(self.inner.count_active_indexed(statute).await?)
  }

  async fn division_child_counts(&self, ids: Vec<DivisionId>) -> Result<HashMap<DivisionId, u64>> {
    Ok(self.inner.division_child_counts(ids).await?)
  }

  async fn provision_child_counts(
    &self,
    ids: Vec<ProvisionId>,
  ) -> Result<HashMap<ProvisionId, u64>> {
    Ok(self.inner.provision_child_counts(ids).await?)
  }

  async fn child_division_previews(
    &self,
    ids: Vec<DivisionId>,
    per_parent: usize,
  ) -> Result<HashMap<DivisionId, Vec<ChildDivision>>> {
    Ok(self.inner.child_division_previews(ids, per_parent).await?)
  }

  async fn last_order_index(&self, statute: StatuteId) -> Result<Option<i64>> {
    Ok(self.inner.last_order_index(statute).await?)
  }

  async fn next_order_index(&self, statute: StatuteId, after: i64) -> Result<Option<i64>> {
    Ok(self.inner.next_order_index(statute, after).await?)
  }

  async fn index_census(&self, statute: StatuteId) -> Result<IndexCensus> {
    Ok(self.inner.index_census(statute).await?)
  }

  async fn reindex(&self, statute: StatuteId, gap: i64, dry_run: bool) -> Result<ReindexOutcome> {
    if self.fail_reindex.load(Ordering::SeqCst) {
      return Err(FlakyError::Locked);
    }
    Ok(self.inner.reindex(statute, gap, dry_run).await?)
  }
}
