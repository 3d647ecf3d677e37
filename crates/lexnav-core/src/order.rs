//! Canonical reading order and reindex bookkeeping.
//!
//! The reading order is a depth-first pre-order over the statute: a
//! division, then its directly-attached top-level provisions (each expanded
//! through its own sub-provisions), then its child divisions. Siblings are
//! ranked by `sort_order`, ties broken by id, so the plan is deterministic.
//!
//! The planner works on a bulk-loaded adjacency snapshot and walks it with an
//! explicit stack; backends load every link of a statute in two queries and
//! never issue per-node lookups while planning.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::node::{ContentKind, ContentRef, DivisionId, ProvisionId};

// ─── Snapshot rows ───────────────────────────────────────────────────────────

/// The tree-shaping columns of a division row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivisionLink {
  pub id:          DivisionId,
  pub parent:      Option<DivisionId>,
  pub sort_order:  i64,
  pub slug:        String,
  pub order_index: Option<i64>,
}

/// The tree-shaping columns of a provision row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionLink {
  pub id:          ProvisionId,
  pub division:    Option<DivisionId>,
  pub parent:      Option<ProvisionId>,
  pub sort_order:  i64,
  pub slug:        String,
  pub order_index: Option<i64>,
}

// ─── Plan ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedNode {
  pub node:      ContentRef,
  pub slug:      String,
  pub old_index: Option<i64>,
}

/// Every node of a statute in reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingPlan {
  pub sequence: Vec<PlannedNode>,
  /// Nodes unreachable from the roots (dangling or cyclic parent pointers).
  /// They are appended after the main traversal.
  pub orphans:  usize,
}

impl ReadingPlan {
  /// Assign `gap, 2·gap, 3·gap, …` along the sequence.
  pub fn assign(&self, gap: i64) -> Vec<IndexChange> {
    self
      .sequence
      .iter()
      .zip(1_i64..)
      .map(|(planned, position)| IndexChange {
        kind:      planned.node.kind(),
        id:        planned.node.raw_id(),
        slug:      planned.slug.clone(),
        old_index: planned.old_index,
        new_index: position * gap,
      })
      .collect()
  }
}

/// One row of a reindex report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexChange {
  #[serde(rename = "type")]
  pub kind:      ContentKind,
  pub id:        i64,
  pub slug:      String,
  pub old_index: Option<i64>,
  pub new_index: i64,
}

impl IndexChange {
  pub fn node(&self) -> ContentRef {
    match self.kind {
      ContentKind::Division => ContentRef::Division(DivisionId(self.id)),
      ContentKind::Provision => ContentRef::Provision(ProvisionId(self.id)),
    }
  }

  pub fn is_unchanged(&self) -> bool { self.old_index == Some(self.new_index) }
}

/// What a backend did inside its reindex transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReindexOutcome {
  pub changes:            Vec<IndexChange>,
  pub divisions_updated:  usize,
  pub provisions_updated: usize,
  pub orphans:            usize,
}

// ─── Planner ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Frame<'a> {
  Division(&'a DivisionLink),
  Provision(&'a ProvisionLink),
}

struct Planner<'a> {
  child_divisions:     HashMap<DivisionId, Vec<&'a DivisionLink>>,
  attached_provisions: HashMap<DivisionId, Vec<&'a ProvisionLink>>,
  child_provisions:    HashMap<ProvisionId, Vec<&'a ProvisionLink>>,
  seen_divisions:      HashSet<DivisionId>,
  seen_provisions:     HashSet<ProvisionId>,
  sequence:            Vec<PlannedNode>,
}

impl<'a> Planner<'a> {
  fn walk(&mut self, root: Frame<'a>) {
    let mut stack = vec![root];

    while let Some(frame) = stack.pop() {
      match frame {
        Frame::Division(d) => {
          if !self.seen_divisions.insert(d.id) {
            continue;
          }
          self.sequence.push(PlannedNode {
            node:      ContentRef::Division(d.id),
            slug:      d.slug.clone(),
            old_index: d.order_index,
          });
          // Pushed in reverse: attached provisions pop before child divisions.
          if let Some(children) = self.child_divisions.get(&d.id) {
            stack.extend(children.iter().rev().copied().map(Frame::Division));
          }
          if let Some(attached) = self.attached_provisions.get(&d.id) {
            stack.extend(attached.iter().rev().copied().map(Frame::Provision));
          }
        }
        Frame::Provision(p) => {
          if !self.seen_provisions.insert(p.id) {
            continue;
          }
          self.sequence.push(PlannedNode {
            node:      ContentRef::Provision(p.id),
            slug:      p.slug.clone(),
            old_index: p.order_index,
          });
          if let Some(children) = self.child_provisions.get(&p.id) {
            stack.extend(children.iter().rev().copied().map(Frame::Provision));
          }
        }
      }
    }
  }
}

/// Compute the canonical reading order of one statute.
///
/// Statute-level provisions (no division, no parent) come first, then each
/// top-level division's subtree.
pub fn plan_reading_order(
  divisions: &[DivisionLink],
  provisions: &[ProvisionLink],
) -> ReadingPlan {
  let mut top_divisions = Vec::new();
  let mut child_divisions: HashMap<DivisionId, Vec<&DivisionLink>> = HashMap::new();
  for d in divisions {
    match d.parent {
      None => top_divisions.push(d),
      Some(parent) => child_divisions.entry(parent).or_default().push(d),
    }
  }

  let mut statute_level = Vec::new();
  let mut attached_provisions: HashMap<DivisionId, Vec<&ProvisionLink>> = HashMap::new();
  let mut child_provisions: HashMap<ProvisionId, Vec<&ProvisionLink>> = HashMap::new();
  for p in provisions {
    match (p.parent, p.division) {
      (Some(parent), _) => child_provisions.entry(parent).or_default().push(p),
      (None, Some(division)) => attached_provisions.entry(division).or_default().push(p),
      (None, None) => statute_level.push(p),
    }
  }

  top_divisions.sort_by_key(|d| (d.sort_order, d.id));
  statute_level.sort_by_key(|p| (p.sort_order, p.id));
  for siblings in child_divisions.values_mut() {
    siblings.sort_by_key(|d| (d.sort_order, d.id));
  }
  for siblings in attached_provisions.values_mut() {
    siblings.sort_by_key(|p| (p.sort_order, p.id));
  }
  for siblings in child_provisions.values_mut() {
    siblings.sort_by_key(|p| (p.sort_order, p.id));
  }

  let mut planner = Planner {
    child_divisions,
    attached_provisions,
    child_provisions,
    seen_divisions: HashSet::with_capacity(divisions.len()),
    seen_provisions: HashSet::with_capacity(provisions.len()),
    sequence: Vec::with_capacity(divisions.len() + provisions.len()),
  };

  for p in statute_level {
    planner.walk(Frame::Provision(p));
  }
  for d in top_divisions {
    planner.walk(Frame::Division(d));
  }
  let reachable = planner.sequence.len();

  // Anything left hangs off a missing or cyclic parent.
  let mut leftover_divisions: Vec<&DivisionLink> = divisions
    .iter()
    .filter(|d| !planner.seen_divisions.contains(&d.id))
    .collect();
  leftover_divisions.sort_by_key(|d| (d.sort_order, d.id));
  for d in leftover_divisions {
    planner.walk(Frame::Division(d));
  }

  let mut leftover_provisions: Vec<&ProvisionLink> = provisions
    .iter()
    .filter(|p| !planner.seen_provisions.contains(&p.id))
    .collect();
  leftover_provisions.sort_by_key(|p| (p.sort_order, p.id));
  for p in leftover_provisions {
    planner.walk(Frame::Provision(p));
  }

  let orphans = planner.sequence.len() - reachable;
  ReadingPlan { sequence: planner.sequence, orphans }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn div(id: i64, parent: Option<i64>, sort: i64) -> DivisionLink {
    DivisionLink {
      id:          DivisionId(id),
      parent:      parent.map(DivisionId),
      sort_order:  sort,
      slug:        format!("d{id}"),
      order_index: None,
    }
  }

  fn prov(id: i64, division: Option<i64>, parent: Option<i64>, sort: i64) -> ProvisionLink {
    ProvisionLink {
      id:          ProvisionId(id),
      division:    division.map(DivisionId),
      parent:      parent.map(ProvisionId),
      sort_order:  sort,
      slug:        format!("p{id}"),
      order_index: None,
    }
  }

  fn slugs(plan: &ReadingPlan) -> Vec<&str> {
    plan.sequence.iter().map(|n| n.slug.as_str()).collect()
  }

  #[test]
  fn division_then_provisions_then_child_divisions() {
    let divisions = [div(1, None, 1), div(2, Some(1), 1), div(3, None, 2)];
    let provisions = [
      prov(10, Some(1), None, 1),
      prov(11, Some(1), Some(10), 1),
      prov(12, Some(1), None, 2),
      prov(20, Some(2), None, 1),
    ];

    let plan = plan_reading_order(&divisions, &provisions);
    assert_eq!(slugs(&plan), ["d1", "p10", "p11", "p12", "d2", "p20", "d3"]);
    assert_eq!(plan.orphans, 0);
  }

  #[test]
  fn sort_order_ties_break_by_id() {
    let divisions = [div(5, None, 1), div(2, None, 1), div(9, None, 0)];
    let plan = plan_reading_order(&divisions, &[]);
    assert_eq!(slugs(&plan), ["d9", "d2", "d5"]);
  }

  #[test]
  fn statute_level_provisions_lead() {
    let divisions = [div(1, None, 1)];
    let provisions = [prov(7, None, None, 3), prov(8, None, Some(7), 1)];
    let plan = plan_reading_order(&divisions, &provisions);
    assert_eq!(slugs(&plan), ["p7", "p8", "d1"]);
  }

  #[test]
  fn dangling_and_cyclic_nodes_are_appended_once() {
    let divisions = [div(1, None, 1), div(2, Some(99), 1), div(3, Some(4), 1), div(4, Some(3), 2)];
    let provisions = [prov(10, Some(1), Some(77), 1)];

    let plan = plan_reading_order(&divisions, &provisions);
    assert_eq!(slugs(&plan), ["d1", "d2", "d3", "d4", "p10"]);
    assert_eq!(plan.orphans, 4);
  }

  #[test]
  fn assign_uses_multiples_of_gap() {
    let mut divisions = vec![div(1, None, 1), div(2, None, 2)];
    divisions[0].order_index = Some(100);
    divisions[1].order_index = Some(150);

    let changes = plan_reading_order(&divisions, &[]).assign(100);
    assert_eq!(changes.iter().map(|c| c.new_index).collect::<Vec<_>>(), [100, 200]);
    assert!(changes[0].is_unchanged());
    assert!(!changes[1].is_unchanged());
    assert_eq!(changes[1].node(), ContentRef::Division(DivisionId(2)));
  }
}
