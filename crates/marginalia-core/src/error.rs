//! Error types for `marginalia-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unrecognized canonical key: {0:?}")]
  UnrecognizedKey(String),

  #[error("unknown engagement action: {0:?}")]
  UnknownAction(String),

  #[error("malformed user id: {0}")]
  UserId(#[from] uuid::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
