//! Error type for `lexnav-store-sqlite`.

use lexnav_core::node::{DivisionId, ProvisionId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] lexnav_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// An update or re-read targeted a division that does not exist.
  #[error("division not found: {0}")]
  DivisionNotFound(DivisionId),

  #[error("provision not found: {0}")]
  ProvisionNotFound(ProvisionId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
