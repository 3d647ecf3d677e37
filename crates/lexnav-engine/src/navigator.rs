//! Cursor pagination over the merged reading order of a statute.
//!
//! Every page is one `UNION ALL` read of both node tables, followed by one
//! batched count query per node kind (and one preview query for child
//! divisions). Nothing here issues per-item queries.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use lexnav_core::{
  cache::ContentCache,
  node::{ContentKind, DivisionId, NodeStatus, ProvisionId},
  statute::Statute,
  store::{ChildDivision, OrderWindow, SequencedRow, StatuteStore},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, breadcrumb::{BreadcrumbBuilder, Crumb}, context::Context};

// ─── Shapes ──────────────────────────────────────────────────────────────────

/// Paging direction relative to `from_order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  /// `order_index < from`, nearest first.
  Before,
  /// `order_index > from`.
  After,
  /// `order_index >= from`; opens a page at a just-resolved node.
  At,
}

impl Direction {
  fn window(self, from: i64) -> OrderWindow {
    match self {
      Self::Before => OrderWindow::Before(from),
      Self::After => OrderWindow::After(from),
      Self::At => OrderWindow::From(from),
    }
  }

  /// The window past the last row of a page.
  fn beyond(self, edge: i64) -> OrderWindow {
    match self {
      Self::Before => OrderWindow::Before(edge),
      Self::After | Self::At => OrderWindow::After(edge),
    }
  }
}

/// Fields only a division row carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DivisionFields {
  pub subtitle:           Option<String>,
  pub content:            Option<String>,
  pub parent_division_id: Option<DivisionId>,
  pub child_count:        u64,
}

/// Fields only a provision row carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionFields {
  pub provision_text:      Option<String>,
  pub marginal_note:       Option<String>,
  pub interpretation_note: Option<String>,
  pub division_id:         Option<DivisionId>,
  pub parent_provision_id: Option<ProvisionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum KindFields {
  Division(DivisionFields),
  Provision(ProvisionFields),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemContent {
  pub id:             i64,
  pub slug:           String,
  pub order_index:    i64,
  pub type_name:      String,
  pub number:         Option<String>,
  pub title:          Option<String>,
  pub level:          i64,
  pub status:         NodeStatus,
  pub effective_date: Option<NaiveDate>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
  pub has_children:   bool,
  #[serde(flatten)]
  pub fields:         KindFields,
}

/// One entry of a nested page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentItem {
  pub order_index: i64,
  #[serde(rename = "type")]
  pub kind:        ContentKind,
  pub content:     ItemContent,
  /// Immediate child divisions; always empty for provisions.
  pub children:    Vec<ChildDivision>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CursorMeta {
  pub direction:       Direction,
  pub from_order:      i64,
  pub limit:           usize,
  /// Exceeds `limit` when nodes share the index at the page edge.
  pub returned:        usize,
  pub has_more:        bool,
  /// Cursor for the next page in the same direction; `None` when exhausted.
  pub next_from_order: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
  pub items: Vec<ContentItem>,
  pub meta:  CursorMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeMeta {
  pub start_order:            i64,
  pub end_order:              i64,
  pub returned:               usize,
  pub total_items_in_statute: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangePage {
  pub items: Vec<ContentItem>,
  pub meta:  RangeMeta,
}

/// One entry of a flat sequential page; every field sits at the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequentialItem {
  pub id:                  i64,
  pub slug:                String,
  #[serde(rename = "type")]
  pub kind:                ContentKind,
  pub division_type:       Option<String>,
  pub division_number:     Option<String>,
  pub division_title:      Option<String>,
  pub division_subtitle:   Option<String>,
  pub content:             Option<String>,
  pub provision_type:      Option<String>,
  pub provision_number:    Option<String>,
  pub provision_title:     Option<String>,
  pub provision_text:      Option<String>,
  pub marginal_note:       Option<String>,
  pub interpretation_note: Option<String>,
  pub level:               i64,
  pub parent_division_id:  Option<i64>,
  pub parent_provision_id: Option<i64>,
  pub division_id:         Option<i64>,
  pub order_index:         i64,
  pub has_children:        bool,
  pub child_count:         u64,
  pub status:              NodeStatus,
  pub effective_date:      Option<NaiveDate>,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub breadcrumb:          Option<Vec<Crumb>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequencePage {
  pub items: Vec<SequentialItem>,
  pub meta:  CursorMeta,
}

/// Child counts for one page of rows.
#[derive(Default)]
struct ChildCounts {
  divisions:  HashMap<DivisionId, u64>,
  provisions: HashMap<ProvisionId, u64>,
}

impl ChildCounts {
  fn of(&self, row: &SequencedRow) -> u64 {
    let n = match row.kind {
      ContentKind::Division => self.divisions.get(&DivisionId(row.id)),
      ContentKind::Provision => self.provisions.get(&ProvisionId(row.id)),
    };
    n.copied().unwrap_or(0)
  }
}

// ─── Navigator ───────────────────────────────────────────────────────────────

pub struct SequentialNavigator<S, C> {
  ctx:         Context<S, C>,
  breadcrumbs: BreadcrumbBuilder<S, C>,
}

impl<S, C> Clone for SequentialNavigator<S, C> {
  fn clone(&self) -> Self {
    Self { ctx: self.ctx.clone(), breadcrumbs: self.breadcrumbs.clone() }
  }
}

impl<S: StatuteStore, C: ContentCache> SequentialNavigator<S, C> {
  pub(crate) fn new(ctx: Context<S, C>, breadcrumbs: BreadcrumbBuilder<S, C>) -> Self {
    Self { ctx, breadcrumbs }
  }

  /// Up to `limit` active nodes before `from`, nearest first.
  pub async fn load_before(
    &self,
    statute: &Statute,
    from: i64,
    limit: usize,
    include_children: bool,
  ) -> Result<Page> {
    self.page(statute, Direction::Before, from, limit, include_children).await
  }

  /// Up to `limit` active nodes after `from`, ascending.
  pub async fn load_after(
    &self,
    statute: &Statute,
    from: i64,
    limit: usize,
    include_children: bool,
  ) -> Result<Page> {
    self.page(statute, Direction::After, from, limit, include_children).await
  }

  /// Every active node in `start..=end`, ascending, if there are at most
  /// `max_range_items` of them.
  pub async fn load_range(
    &self,
    statute: &Statute,
    start: i64,
    end: i64,
    include_children: bool,
  ) -> Result<RangePage> {
    if end < start {
      return Err(Error::InvalidArgument(
        "end_order must be greater than or equal to start_order".into(),
      ));
    }

    // Indices are sparse, so only the realised row count is bounded.
    let max = self.ctx.config.max_range_items;
    let rows = self
      .ctx
      .store
      .sequenced(statute.id, OrderWindow::Between { start, end }, max + 1)
      .await
      .map_err(Error::store)?;
    if rows.len() > max {
      return Err(Error::InvalidArgument(format!(
        "Range contains more than {max} items. Please use a smaller range."
      )));
    }

    let items = self.nested(rows, include_children).await?;
    Ok(RangePage {
      meta: RangeMeta {
        start_order:            start,
        end_order:              end,
        returned:               items.len(),
        total_items_in_statute: self.ctx.total_items(statute.id).await?,
      },
      items,
    })
  }

  /// Flat page in any direction, each item optionally carrying its
  /// breadcrumb trail.
  pub async fn load_sequential(
    &self,
    statute: &Statute,
    from: i64,
    direction: Direction,
    limit: usize,
    with_breadcrumbs: bool,
  ) -> Result<SequencePage> {
    let (rows, meta) = self.read(statute, direction, from, limit).await?;
    let counts = self.counts(&rows).await?;

    let trails = if with_breadcrumbs {
      let nodes: Vec<_> = rows.iter().map(SequencedRow::node).collect();
      Some(self.breadcrumbs.build_many(&nodes, statute).await?)
    } else {
      None
    };
    let mut trails = trails.map(Vec::into_iter);

    let items = rows
      .into_iter()
      .map(|row| {
        let child_count = counts.of(&row);
        let breadcrumb = trails.as_mut().and_then(Iterator::next);
        flat_item(row, child_count, breadcrumb)
      })
      .collect();

    Ok(SequencePage { items, meta })
  }

  async fn page(
    &self,
    statute: &Statute,
    direction: Direction,
    from: i64,
    limit: usize,
    include_children: bool,
  ) -> Result<Page> {
    let (rows, meta) = self.read(statute, direction, from, limit).await?;
    let items = self.nested(rows, include_children).await?;
    Ok(Page { items, meta })
  }

  /// One ordered read plus the "is there more" check past its last row.
  async fn read(
    &self,
    statute: &Statute,
    direction: Direction,
    from: i64,
    limit: usize,
  ) -> Result<(Vec<SequencedRow>, CursorMeta)> {
    let limit = self.ctx.config.clamp_page_limit(limit);
    let store = &self.ctx.store;

    let mut rows = store
      .sequenced(statute.id, direction.window(from), limit)
      .await
      .map_err(Error::store)?;

    // Rows arrive in reading direction, so the last one is the page edge.
    let edge = rows.last().map(|r| r.order_index);

    // The cursor is a bare index, so nodes sharing the edge index must all
    // land on this page or the next one would skip them. A full page is
    // therefore extended by the edge's remaining ties.
    if let Some(edge) = edge.filter(|_| rows.len() == limit) {
      let window = OrderWindow::Between { start: edge, end: edge };
      let mut ties = store
        .sequenced(statute.id, window, self.ctx.config.max_range_items)
        .await
        .map_err(Error::store)?;
      if direction == Direction::Before {
        ties.reverse();
      }
      let present = rows.iter().rev().take_while(|r| r.order_index == edge).count();
      rows.extend(ties.into_iter().skip(present));
    }
    let has_more = match edge {
      Some(edge) => {
        store.has_active_in(statute.id, direction.beyond(edge)).await.map_err(Error::store)?
      }
      None => false,
    };

    let meta = CursorMeta {
      direction,
      from_order: from,
      limit,
      returned: rows.len(),
      has_more,
      next_from_order: edge.filter(|_| has_more),
    };
    Ok((rows, meta))
  }

  async fn counts(&self, rows: &[SequencedRow]) -> Result<ChildCounts> {
    let (divisions, provisions) = split_ids(rows);
    let store = &self.ctx.store;
    Ok(ChildCounts {
      divisions:  store.division_child_counts(divisions).await.map_err(Error::store)?,
      provisions: store.provision_child_counts(provisions).await.map_err(Error::store)?,
    })
  }

  async fn nested(&self, rows: Vec<SequencedRow>, include_children: bool) -> Result<Vec<ContentItem>> {
    let counts = self.counts(&rows).await?;
    let mut previews = if include_children {
      let (divisions, _) = split_ids(&rows);
      self
        .ctx
        .store
        .child_division_previews(divisions, self.ctx.config.child_preview_limit)
        .await
        .map_err(Error::store)?
    } else {
      HashMap::new()
    };

    Ok(
      rows
        .into_iter()
        .map(|row| {
          let child_count = counts.of(&row);
          let children = match row.kind {
            ContentKind::Division => previews.remove(&DivisionId(row.id)).unwrap_or_default(),
            ContentKind::Provision => Vec::new(),
          };
          nested_item(row, child_count, children)
        })
        .collect(),
    )
  }
}

fn split_ids(rows: &[SequencedRow]) -> (Vec<DivisionId>, Vec<ProvisionId>) {
  let mut divisions = Vec::new();
  let mut provisions = Vec::new();
  for row in rows {
    match row.kind {
      ContentKind::Division => divisions.push(DivisionId(row.id)),
      ContentKind::Provision => provisions.push(ProvisionId(row.id)),
    }
  }
  (divisions, provisions)
}

fn nested_item(row: SequencedRow, child_count: u64, children: Vec<ChildDivision>) -> ContentItem {
  let fields = match row.kind {
    ContentKind::Division => KindFields::Division(DivisionFields {
      subtitle: row.subtitle,
      content: row.content,
      parent_division_id: row.parent_id.map(DivisionId),
      child_count,
    }),
    ContentKind::Provision => KindFields::Provision(ProvisionFields {
      provision_text: row.provision_text,
      marginal_note: row.marginal_note,
      interpretation_note: row.interpretation_note,
      division_id: row.division_id.map(DivisionId),
      parent_provision_id: row.parent_id.map(ProvisionId),
    }),
  };

  ContentItem {
    order_index: row.order_index,
    kind: row.kind,
    content: ItemContent {
      id: row.id,
      slug: row.slug,
      order_index: row.order_index,
      type_name: row.type_name,
      number: row.number,
      title: row.title,
      level: row.level,
      status: row.status,
      effective_date: row.effective_date,
      created_at: row.created_at,
      updated_at: row.updated_at,
      has_children: child_count > 0,
      fields,
    },
    children,
  }
}

fn flat_item(row: SequencedRow, child_count: u64, breadcrumb: Option<Vec<Crumb>>) -> SequentialItem {
  let is_division = row.kind == ContentKind::Division;
  let (division_side, provision_side) = if is_division {
    ((Some(row.type_name), row.number, row.title), (None, None, None))
  } else {
    ((None, None, None), (Some(row.type_name), row.number, row.title))
  };

  SequentialItem {
    id: row.id,
    slug: row.slug,
    kind: row.kind,
    division_type: division_side.0,
    division_number: division_side.1,
    division_title: division_side.2,
    division_subtitle: row.subtitle,
    content: row.content,
    provision_type: provision_side.0,
    provision_number: provision_side.1,
    provision_title: provision_side.2,
    provision_text: row.provision_text,
    marginal_note: row.marginal_note,
    interpretation_note: row.interpretation_note,
    level: row.level,
    parent_division_id: if is_division { row.parent_id } else { None },
    parent_provision_id: if is_division { None } else { row.parent_id },
    division_id: row.division_id,
    order_index: row.order_index,
    has_children: child_count > 0,
    child_count,
    status: row.status,
    effective_date: row.effective_date,
    created_at: row.created_at,
    updated_at: row.updated_at,
    breadcrumb,
  }
}
