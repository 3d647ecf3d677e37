//! Order index assignment, reindexing and validation.
//!
//! Indices are sparse: appends land `gap_size` past the last index and
//! insertions take the midpoint of the gap after their anchor. When a gap
//! gets too narrow the statute is renumbered (or, with the `manual`
//! strategy, the insertion is refused).

use std::{collections::BTreeMap, time::Instant};

use lexnav_core::{
  cache::ContentCache,
  config::ReindexStrategy,
  node::{ContentKind, ContentRef},
  order::IndexChange,
  statute::{Statute, StatuteId},
  store::StatuteStore,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{Error, Result, context::Context};

// ─── Reports ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReindexReport {
  pub statute_id:         StatuteId,
  pub statute_slug:       String,
  pub total_items:        usize,
  pub divisions_updated:  usize,
  pub provisions_updated: usize,
  pub dry_run:            bool,
  /// Milliseconds, rounded to two decimals.
  pub duration_ms:        f64,
  pub changes:            Vec<IndexChange>,
  /// Nodes reached only through the fallback pass (broken parent links).
  pub orphans:            usize,
  /// Set when the transaction failed and was rolled back.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error:              Option<String>,
}

impl ReindexReport {
  fn new(statute: &Statute, dry_run: bool) -> Self {
    Self {
      statute_id: statute.id,
      statute_slug: statute.slug.clone(),
      total_items: 0,
      divisions_updated: 0,
      provisions_updated: 0,
      dry_run,
      duration_ms: 0.0,
      changes: Vec::new(),
      orphans: 0,
      error: None,
    }
  }

  pub fn succeeded(&self) -> bool { self.error.is_none() }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStatistics {
  pub total_items:         u64,
  pub items_with_index:    u64,
  pub items_without_index: u64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub average_gap:         Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub minimum_gap:         Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
  pub statute_id:     StatuteId,
  pub statute_slug:   String,
  pub valid:          bool,
  pub issues:         Vec<String>,
  pub statistics:     IndexStatistics,
  /// Index value → number of nodes holding it, for values held more than once.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub duplicates:     Option<BTreeMap<i64, usize>>,
  pub recommendation: String,
  /// Present when `auto_repair` reindexed the statute after validation.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub repair:         Option<ReindexReport>,
}

fn round2(x: f64) -> f64 { (x * 100.0).round() / 100.0 }

/// Gap statistics and validity over a bag of indices.
fn inspect(total: u64, mut indices: Vec<i64>, min_gap_threshold: i64) -> (IndexStatistics, Vec<String>, Option<BTreeMap<i64, usize>>) {
  let with_index = indices.len() as u64;
  let mut stats = IndexStatistics {
    total_items: total,
    items_with_index: with_index,
    items_without_index: total.saturating_sub(with_index),
    ..Default::default()
  };
  let mut issues = Vec::new();

  if stats.items_without_index > 0 {
    issues.push(format!("{} items missing order_index", stats.items_without_index));
  }

  let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
  for &idx in &indices {
    *counts.entry(idx).or_default() += 1;
  }
  counts.retain(|_, n| *n > 1);
  let duplicates = (!counts.is_empty()).then(|| {
    issues.push(format!("{} duplicate order_index values found", counts.len()));
    counts
  });

  indices.sort_unstable();
  let gaps: Vec<i64> = indices.windows(2).map(|w| w[1] - w[0]).collect();
  if let Some(&min) = gaps.iter().min() {
    stats.average_gap = Some(round2(gaps.iter().sum::<i64>() as f64 / gaps.len() as f64));
    stats.minimum_gap = Some(min);
    if min < min_gap_threshold {
      issues.push(format!("Minimum gap ({min}) below threshold ({min_gap_threshold})"));
    }
  }

  (stats, issues, duplicates)
}

// ─── Manager ─────────────────────────────────────────────────────────────────

/// Where an insertion would land.
enum Gap {
  Open(i64),
  Exhausted { next: i64 },
}

pub struct OrderIndexManager<S, C> {
  ctx: Context<S, C>,
}

impl<S, C> Clone for OrderIndexManager<S, C> {
  fn clone(&self) -> Self { Self { ctx: self.ctx.clone() } }
}

impl<S: StatuteStore, C: ContentCache> OrderIndexManager<S, C> {
  pub(crate) fn new(ctx: Context<S, C>) -> Self { Self { ctx } }

  /// Compute the index for a node about to be created.
  ///
  /// Without `after` the node is appended. With `after` it goes into the
  /// gap following that index; an exhausted gap triggers one reindex and a
  /// retry at the anchor's new position (see [`ReindexStrategy`]). `kind`
  /// and `parent` only annotate the trace; placement is decided by `after`.
  pub async fn calculate_order_index(
    &self,
    statute: &Statute,
    kind: ContentKind,
    parent: Option<ContentRef>,
    after: Option<i64>,
  ) -> Result<i64> {
    let gap = self.ctx.config.gap_size;

    let Some(after) = after else {
      let last = self.ctx.store.last_order_index(statute.id).await.map_err(Error::store)?;
      let index = last.unwrap_or(0) + gap;
      debug!(statute = %statute.id, %kind, ?parent, index, "appending");
      return Ok(index);
    };

    let next = match self.gap_after(statute.id, after).await? {
      Gap::Open(index) => {
        debug!(statute = %statute.id, %kind, ?parent, after, index, "inserting");
        return Ok(index);
      }
      Gap::Exhausted { next } => next,
    };

    warn!(statute = %statute.id, after, next, "order index gap exhausted");
    if self.ctx.config.reindex_strategy == ReindexStrategy::Manual {
      return Err(Error::GapExhausted { after, next });
    }

    let report = self.reindex_statute(statute, false).await;
    if let Some(err) = report.error {
      return Err(Error::ReindexFailed(err));
    }

    // The node that held `after` now sits somewhere else; retry behind it.
    let anchor = report
      .changes
      .iter()
      .filter(|c| c.old_index.is_some_and(|old| old <= after))
      .max_by_key(|c| (c.old_index, c.new_index))
      .map_or(0, |c| c.new_index);

    match self.gap_after(statute.id, anchor).await? {
      Gap::Open(index) => {
        debug!(statute = %statute.id, %kind, after, anchor, index, "inserting after reindex");
        Ok(index)
      }
      Gap::Exhausted { next } => Err(Error::GapExhausted { after: anchor, next }),
    }
  }

  async fn gap_after(&self, statute: StatuteId, after: i64) -> Result<Gap> {
    let next = self.ctx.store.next_order_index(statute, after).await.map_err(Error::store)?;
    let Some(next) = next else {
      return Ok(Gap::Open(after + self.ctx.config.gap_size));
    };
    let gap = next - after;
    // A gap of 1 has no midpoint whatever the configured threshold.
    if gap < self.ctx.config.min_gap_threshold.max(2) {
      return Ok(Gap::Exhausted { next });
    }
    Ok(Gap::Open(after + gap / 2))
  }

  /// Renumber the statute in reading order with multiples of `gap_size`.
  ///
  /// Never fails: a rolled-back transaction is reported through
  /// [`ReindexReport::error`]. A committed run flushes every cached entry
  /// derived from the statute.
  pub async fn reindex_statute(&self, statute: &Statute, dry_run: bool) -> ReindexReport {
    let started = Instant::now();
    let mut report = ReindexReport::new(statute, dry_run);

    match self.ctx.store.reindex(statute.id, self.ctx.config.gap_size, dry_run).await {
      Ok(outcome) => {
        report.total_items = outcome.changes.len();
        report.divisions_updated = outcome.divisions_updated;
        report.provisions_updated = outcome.provisions_updated;
        report.orphans = outcome.orphans;
        report.changes = outcome.changes;

        if report.orphans > 0 {
          warn!(
            statute = %statute.id,
            orphans = report.orphans,
            "nodes with broken parent links were appended to the reading order"
          );
        }

        if !dry_run {
          let stale: Vec<i64> = report.changes.iter().filter_map(|c| c.old_index).collect();
          if let Err(err) = self.ctx.flush_statute(statute.id, &stale).await {
            warn!(statute = %statute.id, error = %err, "cache flush after reindex failed");
          }
        }
      }
      Err(err) => {
        warn!(statute = %statute.id, error = %err, "reindex rolled back");
        report.error = Some(err.to_string());
      }
    }

    report.duration_ms = round2(started.elapsed().as_secs_f64() * 1000.0);
    info!(
      statute = %statute.id,
      dry_run,
      total_items = report.total_items,
      divisions_updated = report.divisions_updated,
      provisions_updated = report.provisions_updated,
      duration_ms = report.duration_ms,
      "reindex finished"
    );
    report
  }

  /// Check index health: missing indices, duplicates and narrow gaps.
  pub async fn validate_indices(&self, statute: &Statute) -> Result<ValidationReport> {
    let census = self.ctx.store.index_census(statute.id).await.map_err(Error::store)?;
    let (statistics, issues, duplicates) =
      inspect(census.total_nodes, census.indices, self.ctx.config.min_gap_threshold);

    let valid = issues.is_empty();
    let mut report = ValidationReport {
      statute_id: statute.id,
      statute_slug: statute.slug.clone(),
      valid,
      issues,
      statistics,
      duplicates,
      recommendation: if valid { "No issues found" } else { "Reindexing recommended" }.to_owned(),
      repair: None,
    };

    if !valid && self.ctx.config.auto_repair {
      info!(statute = %statute.id, issues = report.issues.len(), "auto-repairing order indices");
      report.repair = Some(self.reindex_statute(statute, false).await);
    }
    Ok(report)
  }

  /// Active nodes holding an index. Uncached; see
  /// [`crate::ContentResolver::total_items`] for the cached variant.
  pub async fn total_items(&self, statute: &Statute) -> Result<u64> {
    self.ctx.store.count_active_indexed(statute.id).await.map_err(Error::store)
  }
}
