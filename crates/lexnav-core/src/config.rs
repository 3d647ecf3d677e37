//! Tunables for ordering, caching and pagination.
//!
//! Deserialised from the `[navigation]` table of `lexnav.toml`; every field
//! has a default so an empty table is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// What happens when an insertion finds no usable gap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReindexStrategy {
  /// Reindex the statute inline and retry the insertion once.
  #[default]
  Auto,
  /// Refuse the insertion; an operator runs the reindex command.
  Manual,
}

/// How statute-wide invalidation behaves on a cache without tag support.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UntaggedFlush {
  /// Do nothing; entries age out through their TTL.
  #[default]
  Skip,
  /// Enumerate every node of the statute and forget its keys one by one.
  EnumerateKeys,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
  /// Distance between consecutive indices after a reindex or append.
  pub gap_size:            i64,
  /// Insertion gaps below this trigger a reindex.
  pub min_gap_threshold:   i64,
  /// Seconds.
  pub breadcrumb_ttl:      u64,
  /// Seconds.
  pub position_ttl:        u64,
  /// Seconds.
  pub total_items_ttl:     u64,
  /// Group cache entries under a per-statute tag when the backend allows it.
  pub tags_enabled:        bool,
  pub untagged_flush:      UntaggedFlush,
  pub default_page_limit:  usize,
  pub max_page_limit:      usize,
  pub max_range_items:     usize,
  /// Child divisions previewed under each division item.
  pub child_preview_limit: usize,
  pub reindex_strategy:    ReindexStrategy,
  /// Reindex automatically when validation finds problems.
  pub auto_repair:         bool,
}

impl Default for NavigationConfig {
  fn default() -> Self {
    Self {
      gap_size:            100,
      min_gap_threshold:   2,
      breadcrumb_ttl:      3600,
      position_ttl:        1800,
      total_items_ttl:     3600,
      tags_enabled:        true,
      untagged_flush:      UntaggedFlush::default(),
      default_page_limit:  5,
      max_page_limit:      50,
      max_range_items:     100,
      child_preview_limit: 10,
      reindex_strategy:    ReindexStrategy::default(),
      auto_repair:         false,
    }
  }
}

impl NavigationConfig {
  /// Reject settings the ordering scheme cannot work with.
  pub fn validate(&self) -> Result<()> {
    if self.min_gap_threshold < 1 {
      return Err(Error::InvalidConfig(format!(
        "min_gap_threshold must be at least 1, got {}",
        self.min_gap_threshold
      )));
    }
    if self.gap_size < self.min_gap_threshold.max(2) {
      return Err(Error::InvalidConfig(format!(
        "gap_size ({}) must be at least 2 and not below min_gap_threshold ({})",
        self.gap_size, self.min_gap_threshold
      )));
    }
    if self.max_page_limit == 0 || self.max_range_items == 0 {
      return Err(Error::InvalidConfig(
        "max_page_limit and max_range_items must be positive".into(),
      ));
    }
    if self.default_page_limit == 0 || self.default_page_limit > self.max_page_limit {
      return Err(Error::InvalidConfig(format!(
        "default_page_limit must be within 1..={}",
        self.max_page_limit
      )));
    }
    Ok(())
  }

  pub fn breadcrumb_ttl(&self) -> Duration { Duration::from_secs(self.breadcrumb_ttl) }

  pub fn position_ttl(&self) -> Duration { Duration::from_secs(self.position_ttl) }

  pub fn total_items_ttl(&self) -> Duration { Duration::from_secs(self.total_items_ttl) }

  /// Clamp a requested page size into `1..=max_page_limit`.
  pub fn clamp_page_limit(&self, requested: usize) -> usize {
    requested.clamp(1, self.max_page_limit)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_valid() {
    let cfg = NavigationConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.gap_size, 100);
    assert_eq!(cfg.min_gap_threshold, 2);
    assert_eq!(cfg.position_ttl(), Duration::from_secs(1800));
  }

  #[test]
  fn partial_table_fills_defaults() {
    let cfg: NavigationConfig =
      serde_json::from_str(r#"{"gap_size": 1000, "untagged_flush": "enumerate_keys"}"#)
        .unwrap();
    assert_eq!(cfg.gap_size, 1000);
    assert_eq!(cfg.untagged_flush, UntaggedFlush::EnumerateKeys);
    assert_eq!(cfg.max_range_items, 100);
  }

  #[test]
  fn rejects_gap_below_threshold() {
    let cfg = NavigationConfig { gap_size: 1, ..Default::default() };
    assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
  }

  #[test]
  fn clamps_page_limit() {
    let cfg = NavigationConfig::default();
    assert_eq!(cfg.clamp_page_limit(0), 1);
    assert_eq!(cfg.clamp_page_limit(7), 7);
    assert_eq!(cfg.clamp_page_limit(500), 50);
  }
}
