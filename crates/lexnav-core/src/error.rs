//! Error types for `lexnav-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown division type: {0:?}")]
  UnknownDivisionType(String),

  #[error("unknown provision type: {0:?}")]
  UnknownProvisionType(String),

  #[error("unknown node status: {0:?}")]
  UnknownStatus(String),

  #[error("unknown content type: {0:?}")]
  UnknownContentKind(String),

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
