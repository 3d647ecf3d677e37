//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, effective dates `YYYY-MM-DD`. Enum
//! columns hold the lowercase names from `lexnav-core`.

use chrono::{DateTime, NaiveDate, Utc};
use lexnav_core::{
  node::{Division, DivisionId, Provision, ProvisionId},
  statute::{Statute, StatuteId},
  store::{ChildDivision, SequencedRow},
};
use rusqlite::Row;

use crate::{Error, Result};

// ─── Column lists ────────────────────────────────────────────────────────────

/// Column order read by [`read_division`].
pub const DIVISION_COLUMNS: &str = "id, statute_id, slug, parent_division_id, division_type, \
   division_number, division_title, division_subtitle, content, sort_order, level, status, \
   order_index, effective_date, created_at, updated_at";

/// Column order read by [`read_provision`].
pub const PROVISION_COLUMNS: &str = "id, statute_id, slug, division_id, parent_provision_id, \
   provision_type, provision_number, provision_title, provision_text, marginal_note, \
   interpretation_note, sort_order, level, status, order_index, effective_date, created_at, \
   updated_at";

pub const STATUTE_COLUMNS: &str = "id, slug, title, status, created_at, updated_at";

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.as_deref().map(decode_date).transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `statutes` row.
pub struct RawStatute {
  pub id:         i64,
  pub slug:       String,
  pub title:      String,
  pub status:     String,
  pub created_at: String,
  pub updated_at: String,
}

pub fn read_statute(row: &Row<'_>) -> rusqlite::Result<RawStatute> {
  Ok(RawStatute {
    id:         row.get(0)?,
    slug:       row.get(1)?,
    title:      row.get(2)?,
    status:     row.get(3)?,
    created_at: row.get(4)?,
    updated_at: row.get(5)?,
  })
}

impl RawStatute {
  pub fn into_statute(self) -> Result<Statute> {
    Ok(Statute {
      id:         StatuteId(self.id),
      slug:       self.slug,
      title:      self.title,
      status:     self.status,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read from a `statute_divisions` row in [`DIVISION_COLUMNS`]
/// order.
pub struct RawDivision {
  pub id:                 i64,
  pub statute_id:         i64,
  pub slug:               String,
  pub parent_division_id: Option<i64>,
  pub division_type:      String,
  pub division_number:    Option<String>,
  pub division_title:     String,
  pub division_subtitle:  Option<String>,
  pub content:            Option<String>,
  pub sort_order:         i64,
  pub level:              i64,
  pub status:             String,
  pub order_index:        Option<i64>,
  pub effective_date:     Option<String>,
  pub created_at:         String,
  pub updated_at:         String,
}

pub fn read_division(row: &Row<'_>) -> rusqlite::Result<RawDivision> {
  Ok(RawDivision {
    id:                 row.get(0)?,
    statute_id:         row.get(1)?,
    slug:               row.get(2)?,
    parent_division_id: row.get(3)?,
    division_type:      row.get(4)?,
    division_number:    row.get(5)?,
    division_title:     row.get(6)?,
    division_subtitle:  row.get(7)?,
    content:            row.get(8)?,
    sort_order:         row.get(9)?,
    level:              row.get(10)?,
    status:             row.get(11)?,
    order_index:        row.get(12)?,
    effective_date:     row.get(13)?,
    created_at:         row.get(14)?,
    updated_at:         row.get(15)?,
  })
}

impl RawDivision {
  pub fn into_division(self) -> Result<Division> {
    Ok(Division {
      id:                 DivisionId(self.id),
      statute_id:         StatuteId(self.statute_id),
      slug:               self.slug,
      parent_division_id: self.parent_division_id.map(DivisionId),
      division_type:      self.division_type.parse()?,
      division_number:    self.division_number,
      division_title:     self.division_title,
      division_subtitle:  self.division_subtitle,
      content:            self.content,
      sort_order:         self.sort_order,
      level:              self.level,
      status:             self.status.parse()?,
      order_index:        self.order_index,
      effective_date:     decode_opt_date(self.effective_date)?,
      created_at:         decode_dt(&self.created_at)?,
      updated_at:         decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read from a `statute_provisions` row in [`PROVISION_COLUMNS`]
/// order.
pub struct RawProvision {
  pub id:                  i64,
  pub statute_id:          i64,
  pub slug:                String,
  pub division_id:         Option<i64>,
  pub parent_provision_id: Option<i64>,
  pub provision_type:      String,
  pub provision_number:    Option<String>,
  pub provision_title:     Option<String>,
  pub provision_text:      Option<String>,
  pub marginal_note:       Option<String>,
  pub interpretation_note: Option<String>,
  pub sort_order:          i64,
  pub level:               i64,
  pub status:              String,
  pub order_index:         Option<i64>,
  pub effective_date:      Option<String>,
  pub created_at:          String,
  pub updated_at:          String,
}

pub fn read_provision(row: &Row<'_>) -> rusqlite::Result<RawProvision> {
  Ok(RawProvision {
    id:                  row.get(0)?,
    statute_id:          row.get(1)?,
    slug:                row.get(2)?,
    division_id:         row.get(3)?,
    parent_provision_id: row.get(4)?,
    provision_type:      row.get(5)?,
    provision_number:    row.get(6)?,
    provision_title:     row.get(7)?,
    provision_text:      row.get(8)?,
    marginal_note:       row.get(9)?,
    interpretation_note: row.get(10)?,
    sort_order:          row.get(11)?,
    level:               row.get(12)?,
    status:              row.get(13)?,
    order_index:         row.get(14)?,
    effective_date:      row.get(15)?,
    created_at:          row.get(16)?,
    updated_at:          row.get(17)?,
  })
}

impl RawProvision {
  pub fn into_provision(self) -> Result<Provision> {
    Ok(Provision {
      id:                  ProvisionId(self.id),
      statute_id:          StatuteId(self.statute_id),
      slug:                self.slug,
      division_id:         self.division_id.map(DivisionId),
      parent_provision_id: self.parent_provision_id.map(ProvisionId),
      provision_type:      self.provision_type.parse()?,
      provision_number:    self.provision_number,
      provision_title:     self.provision_title,
      provision_text:      self.provision_text,
      marginal_note:       self.marginal_note,
      interpretation_note: self.interpretation_note,
      sort_order:          self.sort_order,
      level:               self.level,
      status:              self.status.parse()?,
      order_index:         self.order_index,
      effective_date:      decode_opt_date(self.effective_date)?,
      created_at:          decode_dt(&self.created_at)?,
      updated_at:          decode_dt(&self.updated_at)?,
    })
  }
}

/// One row of the unified projection produced by the `sequenced` query.
pub struct RawSequenced {
  pub content_type:        String,
  pub id:                  i64,
  pub slug:                String,
  pub order_index:         i64,
  pub type_name:           String,
  pub number:              Option<String>,
  pub title:               Option<String>,
  pub subtitle:            Option<String>,
  pub content:             Option<String>,
  pub provision_text:      Option<String>,
  pub marginal_note:       Option<String>,
  pub interpretation_note: Option<String>,
  pub level:               i64,
  pub parent_id:           Option<i64>,
  pub division_id:         Option<i64>,
  pub status:              String,
  pub effective_date:      Option<String>,
  pub created_at:          String,
  pub updated_at:          String,
}

pub fn read_sequenced(row: &Row<'_>) -> rusqlite::Result<RawSequenced> {
  Ok(RawSequenced {
    content_type:        row.get(0)?,
    id:                  row.get(1)?,
    slug:                row.get(2)?,
    order_index:         row.get(3)?,
    type_name:           row.get(4)?,
    number:              row.get(5)?,
    title:               row.get(6)?,
    subtitle:            row.get(7)?,
    content:             row.get(8)?,
    provision_text:      row.get(9)?,
    marginal_note:       row.get(10)?,
    interpretation_note: row.get(11)?,
    level:               row.get(12)?,
    parent_id:           row.get(13)?,
    division_id:         row.get(14)?,
    status:              row.get(15)?,
    effective_date:      row.get(16)?,
    created_at:          row.get(17)?,
    updated_at:          row.get(18)?,
  })
}

impl RawSequenced {
  pub fn into_row(self) -> Result<SequencedRow> {
    Ok(SequencedRow {
      kind:                self.content_type.parse()?,
      id:                  self.id,
      slug:                self.slug,
      order_index:         self.order_index,
      type_name:           self.type_name,
      number:              self.number,
      title:               self.title,
      subtitle:            self.subtitle,
      content:             self.content,
      provision_text:      self.provision_text,
      marginal_note:       self.marginal_note,
      interpretation_note: self.interpretation_note,
      level:               self.level,
      parent_id:           self.parent_id,
      division_id:         self.division_id,
      status:              self.status.parse()?,
      effective_date:      decode_opt_date(self.effective_date)?,
      created_at:          decode_dt(&self.created_at)?,
      updated_at:          decode_dt(&self.updated_at)?,
    })
  }
}

/// A child-division preview row, keyed by its parent.
pub struct RawChildDivision {
  pub parent:          i64,
  pub id:              i64,
  pub slug:            String,
  pub division_type:   String,
  pub division_number: Option<String>,
  pub division_title:  String,
  pub order_index:     Option<i64>,
}

impl RawChildDivision {
  pub fn into_child(self) -> Result<(DivisionId, ChildDivision)> {
    Ok((DivisionId(self.parent), ChildDivision {
      id:          DivisionId(self.id),
      slug:        self.slug,
      kind:        self.division_type.parse()?,
      number:      self.division_number,
      title:       self.division_title,
      order_index: self.order_index,
    }))
  }
}
