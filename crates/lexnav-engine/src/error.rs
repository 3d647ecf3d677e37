//! Error type for `lexnav-engine`.

use thiserror::Error;

/// How a caller outside the engine should present an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  /// "content not found"
  NotFound,
  /// "bad range" and other rejected arguments.
  BadRequest,
  /// Maintenance gaps and backend failures.
  Internal,
}

impl ErrorClass {
  /// HTTP-equivalent status code.
  pub fn status_code(self) -> u16 {
    match self {
      Self::NotFound => 404,
      Self::BadRequest => 400,
      Self::Internal => 500,
    }
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0}")]
  NotFound(String),

  /// The statute has not been indexed yet.
  #[error("{0}")]
  PreconditionFailed(String),

  #[error("{0}")]
  InvalidArgument(String),

  /// No room after `after` and inline reindexing is disabled.
  #[error("no usable gap after order_index {after} (next is {next}); reindex the statute")]
  GapExhausted { after: i64, next: i64 },

  #[error("inline reindex failed: {0}")]
  ReindexFailed(String),

  #[error(transparent)]
  Core(#[from] lexnav_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error. Used as `.map_err(Error::store)`.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }

  pub fn class(&self) -> ErrorClass {
    match self {
      Self::NotFound(_) => ErrorClass::NotFound,
      Self::InvalidArgument(_) => ErrorClass::BadRequest,
      Self::Core(lexnav_core::Error::InvalidConfig(_) | lexnav_core::Error::Serialization(_)) => {
        ErrorClass::Internal
      }
      Self::Core(_) => ErrorClass::BadRequest,
      Self::PreconditionFailed(_)
      | Self::GapExhausted { .. }
      | Self::ReindexFailed(_)
      | Self::Store(_) => ErrorClass::Internal,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
