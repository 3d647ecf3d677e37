//! The `StatuteStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `lexnav-store-sqlite`).
//! The engine services depend on this abstraction, not on any concrete
//! backend. Cross-table ordered reads are expressed as single operations so a
//! backend can answer them with one set-union query.

use std::{collections::HashMap, future::Future};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  node::{
    ContentKind, ContentNode, ContentRef, Division, DivisionId, DivisionType,
    NewDivision, NewProvision, NodeStatus, Provision, ProvisionId,
  },
  order::ReindexOutcome,
  statute::{NewStatute, Statute, StatuteId},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// A slice of the reading order, keyed by `order_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderWindow {
  /// `order_index < n`, read descending.
  Before(i64),
  /// `order_index > n`, read ascending.
  After(i64),
  /// `order_index >= n`, read ascending.
  From(i64),
  /// `start <= order_index <= end`, read ascending.
  Between { start: i64, end: i64 },
}

impl OrderWindow {
  pub fn is_descending(self) -> bool { matches!(self, Self::Before(_)) }
}

/// How to find a single active node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeLookup {
  Slug(String),
  OrderIndex(i64),
}

/// One row of the unified division ∪ provision projection.
///
/// Division-only columns are `None` on provision rows and vice versa.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencedRow {
  pub kind:                ContentKind,
  pub id:                  i64,
  pub slug:                String,
  pub order_index:         i64,
  /// `division_type` or `provision_type`.
  pub type_name:           String,
  pub number:              Option<String>,
  pub title:               Option<String>,
  pub subtitle:            Option<String>,
  pub content:             Option<String>,
  pub provision_text:      Option<String>,
  pub marginal_note:       Option<String>,
  pub interpretation_note: Option<String>,
  pub level:               i64,
  /// `parent_division_id` or `parent_provision_id`.
  pub parent_id:           Option<i64>,
  /// Owning division of a provision row.
  pub division_id:         Option<i64>,
  pub status:              NodeStatus,
  pub effective_date:      Option<NaiveDate>,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

impl SequencedRow {
  pub fn node(&self) -> ContentRef {
    match self.kind {
      ContentKind::Division => ContentRef::Division(DivisionId(self.id)),
      ContentKind::Provision => ContentRef::Provision(ProvisionId(self.id)),
    }
  }
}

/// Lightweight summary of an immediate child division.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildDivision {
  pub id:          DivisionId,
  pub slug:        String,
  #[serde(rename = "type")]
  pub kind:        DivisionType,
  pub number:      Option<String>,
  pub title:       String,
  pub order_index: Option<i64>,
}

/// A node and the index it currently holds, for key enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeKey {
  pub node:        ContentRef,
  pub order_index: Option<i64>,
}

/// Raw material for index validation, across all statuses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexCensus {
  pub total_nodes: u64,
  /// Every assigned index, unsorted, duplicates included.
  pub indices:     Vec<i64>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the two node tables of a statute store.
///
/// Unless stated otherwise, reads that feed navigation consider active nodes
/// only, while reads that feed index maintenance see every status (inactive
/// nodes keep their indices and still occupy positions).
pub trait StatuteStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Statutes ──────────────────────────────────────────────────────────

  fn insert_statute(
    &self,
    input: NewStatute,
  ) -> impl Future<Output = Result<Statute, Self::Error>> + Send + '_;

  fn get_statute(
    &self,
    id: StatuteId,
  ) -> impl Future<Output = Result<Option<Statute>, Self::Error>> + Send + '_;

  fn find_statute<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Option<Statute>, Self::Error>> + Send + 'a;

  fn list_statutes(
    &self,
  ) -> impl Future<Output = Result<Vec<Statute>, Self::Error>> + Send + '_;

  // ── Node writes ───────────────────────────────────────────────────────

  fn insert_division(
    &self,
    input: NewDivision,
  ) -> impl Future<Output = Result<Division, Self::Error>> + Send + '_;

  fn insert_provision(
    &self,
    input: NewProvision,
  ) -> impl Future<Output = Result<Provision, Self::Error>> + Send + '_;

  /// Overwrite a single node's index. Used for backfills and fixtures; bulk
  /// renumbering goes through [`Self::reindex`].
  fn set_order_index(
    &self,
    node: ContentRef,
    order_index: Option<i64>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn set_status(
    &self,
    node: ContentRef,
    status: NodeStatus,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Re-parent a division; `level` follows the new parent across the
  /// whole subtree.
  fn place_division(
    &self,
    id: DivisionId,
    parent: Option<DivisionId>,
    sort_order: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Re-parent a provision; `level` follows the new parent provision and
  /// every sub-provision moves into `division` with it.
  fn place_provision(
    &self,
    id: ProvisionId,
    division: Option<DivisionId>,
    parent: Option<ProvisionId>,
    sort_order: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Node reads ────────────────────────────────────────────────────────

  /// Any status.
  fn get_division(
    &self,
    id: DivisionId,
  ) -> impl Future<Output = Result<Option<Division>, Self::Error>> + Send + '_;

  /// Any status.
  fn get_provision(
    &self,
    id: ProvisionId,
  ) -> impl Future<Output = Result<Option<Provision>, Self::Error>> + Send + '_;

  /// Find an *active* node of `kind` in a statute.
  fn find_active(
    &self,
    statute: StatuteId,
    kind: ContentKind,
    lookup: NodeLookup,
  ) -> impl Future<Output = Result<Option<ContentNode>, Self::Error>> + Send + '_;

  /// Root-first chain of divisions ending at `id`, fetched in one query.
  /// A cyclic chain yields each division once.
  fn division_lineage(
    &self,
    id: DivisionId,
  ) -> impl Future<Output = Result<Vec<Division>, Self::Error>> + Send + '_;

  /// Root-first chain of provisions ending at `id`, fetched in one query.
  fn provision_lineage(
    &self,
    id: ProvisionId,
  ) -> impl Future<Output = Result<Vec<Provision>, Self::Error>> + Send + '_;

  /// Direct children of any status: child divisions and attached top-level
  /// provisions of a division, or child provisions of a provision.
  fn children_of(
    &self,
    node: ContentRef,
  ) -> impl Future<Output = Result<Vec<ContentRef>, Self::Error>> + Send + '_;

  /// Every node of a statute with its current index, any status.
  fn node_keys(
    &self,
    statute: StatuteId,
  ) -> impl Future<Output = Result<Vec<NodeKey>, Self::Error>> + Send + '_;

  // ── Ordered reads (active nodes) ──────────────────────────────────────

  /// Active rows of both tables inside `window`, merged, sorted by
  /// `(order_index, content_type, id)` in the window's direction and cut at
  /// `limit`.
  fn sequenced(
    &self,
    statute: StatuteId,
    window: OrderWindow,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<SequencedRow>, Self::Error>> + Send + '_;

  /// Whether any active node of either table lies inside `window`.
  fn has_active_in(
    &self,
    statute: StatuteId,
    window: OrderWindow,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Active nodes of both kinds with a non-null index.
  fn count_active_indexed(
    &self,
    statute: StatuteId,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Active child divisions plus active attached top-level provisions, per
  /// division. Divisions without children are absent from the map.
  fn division_child_counts(
    &self,
    ids: Vec<DivisionId>,
  ) -> impl Future<Output = Result<HashMap<DivisionId, u64>, Self::Error>> + Send + '_;

  /// Active child provisions, per provision.
  fn provision_child_counts(
    &self,
    ids: Vec<ProvisionId>,
  ) -> impl Future<Output = Result<HashMap<ProvisionId, u64>, Self::Error>> + Send + '_;

  /// Up to `per_parent` active child divisions of each division, by sort order.
  fn child_division_previews(
    &self,
    ids: Vec<DivisionId>,
    per_parent: usize,
  ) -> impl Future<Output = Result<HashMap<DivisionId, Vec<ChildDivision>>, Self::Error>>
  + Send
  + '_;

  // ── Index maintenance (all statuses) ──────────────────────────────────

  /// Highest assigned index in either table.
  fn last_order_index(
    &self,
    statute: StatuteId,
  ) -> impl Future<Output = Result<Option<i64>, Self::Error>> + Send + '_;

  /// Smallest assigned index strictly greater than `after`, in either table.
  fn next_order_index(
    &self,
    statute: StatuteId,
    after: i64,
  ) -> impl Future<Output = Result<Option<i64>, Self::Error>> + Send + '_;

  fn index_census(
    &self,
    statute: StatuteId,
  ) -> impl Future<Output = Result<IndexCensus, Self::Error>> + Send + '_;

  /// Renumber every node of the statute in reading order with multiples of
  /// `gap`, inside a single transaction.
  ///
  /// With `dry_run` the transaction is rolled back and the outcome only
  /// describes what would change (`*_updated` stay zero).
  fn reindex(
    &self,
    statute: StatuteId,
    gap: i64,
    dry_run: bool,
  ) -> impl Future<Output = Result<ReindexOutcome, Self::Error>> + Send + '_;
}
