//! Statute: the document root that owns every division and provision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

row_id! {
  /// Primary key of a statute row.
  StatuteId
}

/// A statute as read by the navigation engine. Never mutated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statute {
  pub id:         StatuteId,
  pub slug:       String,
  pub title:      String,
  /// Publication status of the document (e.g. `"published"`, `"draft"`).
  pub status:     String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Statute {
  /// Cache tag grouping every cached entry derived from this statute.
  pub fn cache_tag(&self) -> String { crate::cache::statute_tag(self.id) }
}

/// Input for seeding a statute.
#[derive(Debug, Clone)]
pub struct NewStatute {
  pub slug:   String,
  pub title:  String,
  pub status: String,
}

impl NewStatute {
  pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
    Self {
      slug:   slug.into(),
      title:  title.into(),
      status: "published".to_owned(),
    }
  }
}
