//! Divisions and provisions, the two node kinds of a statute.
//!
//! Both kinds live in their own table but share one reading order through
//! the `order_index` column. [`ContentRef`] and [`ContentNode`] are the
//! kind-tagged handles the rest of the engine passes around.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, statute::StatuteId};

row_id! {
  /// Primary key of a division row.
  DivisionId
}

row_id! {
  /// Primary key of a provision row.
  ProvisionId
}

// ─── Kind ────────────────────────────────────────────────────────────────────

/// Which of the two node tables a row lives in.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
  Division,
  Provision,
}

impl ContentKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Division => "division",
      Self::Provision => "provision",
    }
  }
}

impl fmt::Display for ContentKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ContentKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "division" => Ok(Self::Division),
      "provision" => Ok(Self::Provision),
      other => Err(Error::UnknownContentKind(other.to_owned())),
    }
  }
}

/// A typed reference to a node in either table.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ContentRef {
  Division(DivisionId),
  Provision(ProvisionId),
}

impl ContentRef {
  pub fn kind(self) -> ContentKind {
    match self {
      Self::Division(_) => ContentKind::Division,
      Self::Provision(_) => ContentKind::Provision,
    }
  }

  /// The raw row id, meaningful only together with [`Self::kind`].
  pub fn raw_id(self) -> i64 {
    match self {
      Self::Division(id) => id.0,
      Self::Provision(id) => id.0,
    }
  }
}

impl fmt::Display for ContentRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.kind(), self.raw_id())
  }
}

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Structural division types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DivisionType {
  Part,
  Chapter,
  Article,
  Title,
  Book,
  Division,
  Section,
  Subsection,
  Schedule,
}

impl DivisionType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Part => "part",
      Self::Chapter => "chapter",
      Self::Article => "article",
      Self::Title => "title",
      Self::Book => "book",
      Self::Division => "division",
      Self::Section => "section",
      Self::Subsection => "subsection",
      Self::Schedule => "schedule",
    }
  }
}

impl FromStr for DivisionType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "part" => Ok(Self::Part),
      "chapter" => Ok(Self::Chapter),
      "article" => Ok(Self::Article),
      "title" => Ok(Self::Title),
      "book" => Ok(Self::Book),
      "division" => Ok(Self::Division),
      "section" => Ok(Self::Section),
      "subsection" => Ok(Self::Subsection),
      "schedule" => Ok(Self::Schedule),
      other => Err(Error::UnknownDivisionType(other.to_owned())),
    }
  }
}

/// Textual provision types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionType {
  Section,
  Subsection,
  Paragraph,
  Subparagraph,
  Clause,
  Subclause,
  Item,
}

impl ProvisionType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Section => "section",
      Self::Subsection => "subsection",
      Self::Paragraph => "paragraph",
      Self::Subparagraph => "subparagraph",
      Self::Clause => "clause",
      Self::Subclause => "subclause",
      Self::Item => "item",
    }
  }
}

impl FromStr for ProvisionType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "section" => Ok(Self::Section),
      "subsection" => Ok(Self::Subsection),
      "paragraph" => Ok(Self::Paragraph),
      "subparagraph" => Ok(Self::Subparagraph),
      "clause" => Ok(Self::Clause),
      "subclause" => Ok(Self::Subclause),
      "item" => Ok(Self::Item),
      other => Err(Error::UnknownProvisionType(other.to_owned())),
    }
  }
}

/// Lifecycle status shared by both node kinds. Only [`NodeStatus::Active`]
/// nodes take part in navigation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
  #[default]
  Active,
  Repealed,
  Amended,
}

impl NodeStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Active => "active",
      Self::Repealed => "repealed",
      Self::Amended => "amended",
    }
  }

  pub fn is_active(self) -> bool { matches!(self, Self::Active) }
}

impl FromStr for NodeStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "active" => Ok(Self::Active),
      "repealed" => Ok(Self::Repealed),
      "amended" => Ok(Self::Amended),
      other => Err(Error::UnknownStatus(other.to_owned())),
    }
  }
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// A structural container (part, chapter, schedule…).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Division {
  pub id:                 DivisionId,
  pub statute_id:         StatuteId,
  pub slug:               String,
  pub parent_division_id: Option<DivisionId>,
  pub division_type:      DivisionType,
  pub division_number:    Option<String>,
  pub division_title:     String,
  pub division_subtitle:  Option<String>,
  pub content:            Option<String>,
  /// Author-assigned rank among siblings.
  pub sort_order:         i64,
  pub level:              i64,
  pub status:             NodeStatus,
  /// Position in the statute-wide reading order; `None` until indexed.
  pub order_index:        Option<i64>,
  pub effective_date:     Option<NaiveDate>,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
}

/// A textual unit (section, subsection, clause…).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provision {
  pub id:                  ProvisionId,
  pub statute_id:          StatuteId,
  pub slug:                String,
  /// Owning division; `None` for statute-level provisions.
  pub division_id:         Option<DivisionId>,
  pub parent_provision_id: Option<ProvisionId>,
  pub provision_type:      ProvisionType,
  pub provision_number:    Option<String>,
  pub provision_title:     Option<String>,
  pub provision_text:      Option<String>,
  pub marginal_note:       Option<String>,
  pub interpretation_note: Option<String>,
  pub sort_order:          i64,
  pub level:               i64,
  pub status:              NodeStatus,
  pub order_index:         Option<i64>,
  pub effective_date:      Option<NaiveDate>,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

/// Either node kind, as loaded from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentNode {
  Division(Division),
  Provision(Provision),
}

impl ContentNode {
  pub fn kind(&self) -> ContentKind {
    match self {
      Self::Division(_) => ContentKind::Division,
      Self::Provision(_) => ContentKind::Provision,
    }
  }

  pub fn content_ref(&self) -> ContentRef {
    match self {
      Self::Division(d) => ContentRef::Division(d.id),
      Self::Provision(p) => ContentRef::Provision(p.id),
    }
  }

  pub fn statute_id(&self) -> StatuteId {
    match self {
      Self::Division(d) => d.statute_id,
      Self::Provision(p) => p.statute_id,
    }
  }

  pub fn slug(&self) -> &str {
    match self {
      Self::Division(d) => &d.slug,
      Self::Provision(p) => &p.slug,
    }
  }

  pub fn order_index(&self) -> Option<i64> {
    match self {
      Self::Division(d) => d.order_index,
      Self::Provision(p) => p.order_index,
    }
  }

  pub fn status(&self) -> NodeStatus {
    match self {
      Self::Division(d) => d.status,
      Self::Provision(p) => p.status,
    }
  }
}

impl From<Division> for ContentNode {
  fn from(d: Division) -> Self { Self::Division(d) }
}

impl From<Provision> for ContentNode {
  fn from(p: Provision) -> Self { Self::Provision(p) }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input for creating a division. `order_index` is filled in by the engine.
#[derive(Debug, Clone)]
pub struct NewDivision {
  pub statute_id:         StatuteId,
  pub slug:               String,
  pub parent_division_id: Option<DivisionId>,
  pub division_type:      DivisionType,
  pub division_number:    Option<String>,
  pub division_title:     String,
  pub division_subtitle:  Option<String>,
  pub content:            Option<String>,
  pub sort_order:         i64,
  pub level:              i64,
  pub status:             NodeStatus,
  pub order_index:        Option<i64>,
  pub effective_date:     Option<NaiveDate>,
}

impl NewDivision {
  /// A top-level, active division with no number and sort order 0.
  pub fn new(
    statute_id: StatuteId,
    slug: impl Into<String>,
    division_type: DivisionType,
    title: impl Into<String>,
  ) -> Self {
    Self {
      statute_id,
      slug: slug.into(),
      parent_division_id: None,
      division_type,
      division_number: None,
      division_title: title.into(),
      division_subtitle: None,
      content: None,
      sort_order: 0,
      level: 1,
      status: NodeStatus::Active,
      order_index: None,
      effective_date: None,
    }
  }

  pub fn under(mut self, parent: DivisionId) -> Self {
    self.parent_division_id = Some(parent);
    self
  }

  pub fn sorted(mut self, sort_order: i64) -> Self {
    self.sort_order = sort_order;
    self
  }

  pub fn indexed(mut self, order_index: i64) -> Self {
    self.order_index = Some(order_index);
    self
  }
}

/// Input for creating a provision. `order_index` is filled in by the engine.
#[derive(Debug, Clone)]
pub struct NewProvision {
  pub statute_id:          StatuteId,
  pub slug:                String,
  pub division_id:         Option<DivisionId>,
  pub parent_provision_id: Option<ProvisionId>,
  pub provision_type:      ProvisionType,
  pub provision_number:    Option<String>,
  pub provision_title:     Option<String>,
  pub provision_text:      Option<String>,
  pub marginal_note:       Option<String>,
  pub interpretation_note: Option<String>,
  pub sort_order:          i64,
  pub level:               i64,
  pub status:              NodeStatus,
  pub order_index:         Option<i64>,
  pub effective_date:      Option<NaiveDate>,
}

impl NewProvision {
  /// A statute-level, active provision with sort order 0.
  pub fn new(
    statute_id: StatuteId,
    slug: impl Into<String>,
    provision_type: ProvisionType,
  ) -> Self {
    Self {
      statute_id,
      slug: slug.into(),
      division_id: None,
      parent_provision_id: None,
      provision_type,
      provision_number: None,
      provision_title: None,
      provision_text: None,
      marginal_note: None,
      interpretation_note: None,
      sort_order: 0,
      level: 1,
      status: NodeStatus::Active,
      order_index: None,
      effective_date: None,
    }
  }

  pub fn in_division(mut self, division: DivisionId) -> Self {
    self.division_id = Some(division);
    self
  }

  pub fn under(mut self, parent: ProvisionId) -> Self {
    self.parent_provision_id = Some(parent);
    self
  }

  pub fn sorted(mut self, sort_order: i64) -> Self {
    self.sort_order = sort_order;
    self
  }

  pub fn indexed(mut self, order_index: i64) -> Self {
    self.order_index = Some(order_index);
    self
  }
}
